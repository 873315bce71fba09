pub mod crud;
pub mod query;
pub mod validation;

pub use crud::CrudService;
pub use query::{ListParams, Pagination};
pub use validation::RequestValidator;
