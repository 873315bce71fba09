//! Router assembly and the request pipeline.

use crate::auth;
use crate::error::AppError;
use crate::middleware::{
    hpp, parse_body, parse_cookies, rate_limit, security_headers, strip_injection, xss_clean,
};
use crate::routes::{appointment_routes, auth_routes, common_routes, docs_routes, hospital_routes};
use crate::state::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const API_PREFIX: &str = "/api/v1";

/// The `/api/v1` routes with the access guard, before the pipeline.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(hospital_routes())
        .merge(appointment_routes())
        .merge(auth_routes())
        .route_layer(from_fn_with_state(state.clone(), auth::guard))
}

/// Full application. API requests pass, in order: body parse, XSS escape,
/// injection strip, security headers, cookies, rate limit, HPP, CORS, guard.
/// Docs and probes sit outside that chain.
pub fn build_app(state: AppState) -> Router {
    let pipeline = ServiceBuilder::new()
        .layer(from_fn_with_state(state.clone(), parse_body))
        .layer(from_fn(xss_clean))
        .layer(from_fn(strip_injection))
        .layer(from_fn(security_headers))
        .layer(from_fn(parse_cookies))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn_with_state(state.clone(), hpp))
        .layer(CorsLayer::permissive());

    Router::new()
        .nest(API_PREFIX, api_routes(&state).layer(pipeline))
        .merge(docs_routes())
        .merge(common_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("route not found".into())
}
