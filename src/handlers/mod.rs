//! HTTP handlers for hospitals, appointments and auth.

pub mod appointments;
pub mod auth;
pub mod hospitals;
