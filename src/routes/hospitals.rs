use crate::handlers::hospitals::{create_hospital, delete_hospital, get_hospital, list_hospitals, update_hospital};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn hospital_routes() -> Router<AppState> {
    Router::new()
        .route("/hospitals", get(list_hospitals).post(create_hospital))
        .route(
            "/hospitals/:id",
            get(get_hospital).put(update_hospital).delete(delete_hospital),
        )
}
