use super::Resource;
use crate::db::{CollectionSpec, HOSPITALS};
use crate::service::validation::{Rules, ValidationRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postalcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Resource for Hospital {
    const COLLECTION: CollectionSpec = HOSPITALS;
    const LABEL: &'static str = "hospital";
    const RULES: Rules = &[
        ("name", ValidationRule::required().max_length(50)),
        ("address", ValidationRule::required()),
        ("district", ValidationRule::optional()),
        ("province", ValidationRule::optional()),
        ("postalcode", ValidationRule::optional().max_length(5)),
        ("tel", ValidationRule::optional()),
        ("region", ValidationRule::optional()),
    ];
}

/// Body accepted by create and update. On update every field is optional.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HospitalInput {
    #[schema(example = "General")]
    pub name: Option<String>,
    #[schema(example = "123 Main")]
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    #[schema(example = "10110")]
    pub postalcode: Option<String>,
    pub tel: Option<String>,
    pub region: Option<String>,
}

/// The hospital fields embedded in appointment responses.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HospitalSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
}

impl From<&Hospital> for HospitalSummary {
    fn from(h: &Hospital) -> Self {
        HospitalSummary {
            id: h.id,
            name: h.name.clone(),
            province: h.province.clone(),
            tel: h.tel.clone(),
        }
    }
}
