//! Vaccine booking REST backend: hospitals, appointments and accounts over a
//! document store, behind a security middleware pipeline and role-based access.

pub mod app;
pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;

pub use app::{build_app, API_PREFIX};
pub use db::{DocumentStore, MemoryStore, PgStore, SharedStore};
pub use error::{AppError, ConfigError, StoreError};
pub use lifecycle::{install_panic_hook, serve, FatalSignal, Outcome, EXIT_FATAL, EXIT_STARTUP};
pub use openapi::ApiDoc;
pub use settings::{AppConfig, Environment};
pub use state::AppState;
