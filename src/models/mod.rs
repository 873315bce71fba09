//! Document types for the three collections.

pub mod appointment;
pub mod hospital;
pub mod user;

pub use appointment::{Appointment, AppointmentInput, AppointmentView, HospitalRef};
pub use hospital::{Hospital, HospitalInput, HospitalSummary};
pub use user::{RegisterInput, Role, User, UserView};

use crate::db::{CollectionSpec, Document};
use crate::error::StoreError;
use crate::service::validation::Rules;
use serde::de::DeserializeOwned;

/// A typed view over one collection.
pub trait Resource: DeserializeOwned + Send {
    const COLLECTION: CollectionSpec;
    /// Writable body fields and their constraints.
    const RULES: Rules;
    /// Human-readable name used in error messages.
    const LABEL: &'static str;

    fn from_document(doc: Document) -> Result<Self, StoreError> {
        let id = doc.id;
        serde_json::from_value(doc.into_value()).map_err(|e| StoreError::Malformed {
            collection: Self::COLLECTION.name.to_string(),
            message: format!("{}: {}", id, e),
        })
    }
}
