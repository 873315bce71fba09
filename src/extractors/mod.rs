pub mod body;
pub mod identity;

pub use body::JsonBody;
pub use identity::CurrentUser;
