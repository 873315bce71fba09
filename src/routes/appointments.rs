//! Appointment routes, including the per-hospital listing and booking.

use crate::handlers::appointments::{
    create_appointment, create_hospital_appointment, delete_appointment, get_appointment,
    list_appointments, list_hospital_appointments, update_appointment,
};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route(
            "/appointments/:id",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route(
            "/hospitals/:id/appointments",
            get(list_hospital_appointments).post(create_hospital_appointment),
        )
}
