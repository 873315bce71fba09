//! Route tables. Access rules for every route live in `auth::policy`.

pub mod appointments;
pub mod auth;
pub mod common;
pub mod docs;
pub mod hospitals;

pub use appointments::appointment_routes;
pub use auth::auth_routes;
pub use common::common_routes;
pub use docs::docs_routes;
pub use hospitals::hospital_routes;
