//! Request pipeline stages, applied in `app::build_app`.

pub mod body;
pub mod cookies;
pub mod headers;
pub mod hpp;
pub mod query;
pub mod rate_limit;
pub mod sanitize;

pub use body::parse_body;
pub use cookies::parse_cookies;
pub use headers::security_headers;
pub use hpp::hpp;
pub use rate_limit::rate_limit;
pub use sanitize::{strip_injection, xss_clean};
