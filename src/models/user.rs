use super::Resource;
use crate::db::{CollectionSpec, USERS};
use crate::service::validation::{Format, Rules, ValidationRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user. `password` holds the argon2 PHC string, never the plain text.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub tel: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Resource for User {
    const COLLECTION: CollectionSpec = USERS;
    const LABEL: &'static str = "user";
    const RULES: Rules = &[
        ("name", ValidationRule::required()),
        ("tel", ValidationRule::optional()),
        ("email", ValidationRule::required().format(Format::Email)),
        ("role", ValidationRule::optional().allowed(&["user", "admin"])),
        ("password", ValidationRule::required().min_length(6)),
    ];
}

/// Public projection of a user.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        UserView {
            id: u.id,
            name: u.name,
            email: u.email,
            tel: u.tel,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct RegisterInput {
    #[schema(example = "Jane Doe")]
    pub name: String,
    pub tel: Option<String>,
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub role: Option<Role>,
    #[schema(example = "secret123")]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Document;
    use serde_json::json;

    #[test]
    fn view_never_carries_password() {
        let doc = Document {
            id: Uuid::new_v4(),
            body: json!({"name": "Jane", "email": "j@x.io", "role": "admin", "password": "$argon2id$..."})
                .as_object()
                .cloned()
                .unwrap(),
            created_at: Utc::now(),
        };
        let user = User::from_document(doc).unwrap();
        assert_eq!(user.role, Role::Admin);
        let out = serde_json::to_value(UserView::from(user)).unwrap();
        assert!(out.get("password").is_none());
        assert_eq!(out["role"], "admin");
    }
}
