use super::{HospitalSummary, Resource};
use crate::db::{CollectionSpec, APPOINTMENTS};
use crate::service::validation::{Format, Rules, ValidationRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub appt_date: DateTime<Utc>,
    pub user: Uuid,
    pub hospital: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Resource for Appointment {
    const COLLECTION: CollectionSpec = APPOINTMENTS;
    const LABEL: &'static str = "appointment";
    const RULES: Rules = &[
        ("apptDate", ValidationRule::required().format(Format::Timestamp)),
        ("user", ValidationRule::required().format(Format::Uuid)),
        ("hospital", ValidationRule::required().format(Format::Uuid)),
    ];
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    #[schema(example = "2026-11-02T09:30:00Z")]
    pub appt_date: Option<DateTime<Utc>>,
    /// Admins only: book on behalf of this user.
    pub user: Option<Uuid>,
    /// Required on `POST /appointments`; taken from the path on the nested route.
    pub hospital: Option<Uuid>,
}

/// Populated hospital when it still exists, otherwise the bare id.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum HospitalRef {
    Populated(HospitalSummary),
    Id(Uuid),
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub appt_date: DateTime<Utc>,
    pub user: Uuid,
    pub hospital: HospitalRef,
    pub created_at: DateTime<Utc>,
}

impl AppointmentView {
    pub fn new(appt: Appointment, hospital: Option<HospitalSummary>) -> Self {
        let hospital = match hospital {
            Some(h) => HospitalRef::Populated(h),
            None => HospitalRef::Id(appt.hospital),
        };
        AppointmentView {
            id: appt.id,
            appt_date: appt.appt_date,
            user: appt.user,
            hospital,
            created_at: appt.created_at,
        }
    }
}
