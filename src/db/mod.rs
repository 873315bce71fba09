//! Document store: JSON documents grouped in named collections.
//!
//! The application holds exactly one [`DocumentStore`], built at startup and
//! passed around inside [`crate::state::AppState`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{connect, ensure_collections, ensure_database_exists, PgStore};

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Collection declaration: name plus the body fields that must be unique.
#[derive(Clone, Copy, Debug)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub unique: &'static [&'static str],
}

pub const HOSPITALS: CollectionSpec = CollectionSpec {
    name: "hospitals",
    unique: &["name"],
};

pub const APPOINTMENTS: CollectionSpec = CollectionSpec {
    name: "appointments",
    unique: &[],
};

pub const USERS: CollectionSpec = CollectionSpec {
    name: "users",
    unique: &["email"],
};

pub const COLLECTIONS: &[CollectionSpec] = &[HOSPITALS, APPOINTMENTS, USERS];

/// Pseudo-field that sorts on the store-assigned creation time.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A stored document. `body` never contains `id` or `createdAt`; those live beside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub body: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Body with `id` and `createdAt` merged in, ready for deserialization.
    pub fn into_value(self) -> Value {
        let mut body = self.body;
        body.insert("id".into(), Value::String(self.id.to_string()));
        body.insert(
            CREATED_AT_FIELD.into(),
            Value::String(self.created_at.to_rfc3339()),
        );
        Value::Object(body)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Exact-match filter, sort keys and window for a `find`.
#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub filter: Map<String, Value>,
    pub sort: Vec<(String, SortOrder)>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl FindQuery {
    pub fn filtered(filter: Map<String, Value>) -> Self {
        FindQuery {
            filter,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document; the store assigns `id` and `createdAt`.
    async fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<Document, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Map<String, Value>) -> Result<u64, StoreError>;

    /// Shallow-merge `patch` into the body. Returns the updated document, or None when missing.
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove by id. Returns the removed document, or None when missing.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Remove every document matching `filter`. Returns how many were removed.
    async fn delete_many(&self, collection: &str, filter: &Map<String, Value>) -> Result<u64, StoreError>;

    /// Cheap liveness check used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Field names reach SQL as JSON path keys; restrict them to plain identifiers.
pub fn validate_field_name(field: &str) -> Result<(), StoreError> {
    let ok = !field.is_empty()
        && field.len() <= 64
        && field.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false)
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidField(field.to_string()))
    }
}

pub(crate) fn spec_for(collection: &str) -> Result<&'static CollectionSpec, StoreError> {
    COLLECTIONS
        .iter()
        .find(|c| c.name == collection)
        .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
}
