//! Authentication (who is calling) and authorization (may they call this route).

pub mod guard;
pub mod password;
pub mod policy;
pub mod token;

pub use guard::{authenticate, guard};
pub use password::{hash_password, verify_password};
pub use policy::{authorize, Access, RoutePolicy};
pub use token::{Claims, TokenError, TokenService};

use crate::models::{Role, User};
use uuid::Uuid;

/// The caller resolved by the authentication gate, attached to the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Identity {
    fn from(u: &User) -> Self {
        Identity {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}
