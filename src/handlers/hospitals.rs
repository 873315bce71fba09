//! Hospital handlers: public reads, admin writes.

use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::models::{Appointment, Hospital, HospitalInput, Resource};
use crate::response::{success_one, success_one_ok, success_page, Empty, SuccessMany, SuccessOne};
use crate::service::crud::parse_id;
use crate::service::validation::{retain_known, trim_strings};
use crate::service::{CrudService, ListParams, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/hospitals",
    tag = "hospitals",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("limit" = Option<u64>, Query, description = "Page size, at most 100"),
        ("sort" = Option<String>, Query, description = "Comma-separated fields, `-` prefix for descending"),
        ("province" = Option<String>, Query, description = "Exact match; any hospital field can filter"),
    ),
    responses(
        (status = 200, description = "One page of hospitals", body = SuccessMany<Hospital>),
        (status = 400, description = "Malformed paging or sort"),
    )
)]
pub async fn list_hospitals(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let params = ListParams::from_query(&params, Hospital::RULES)?;
    let store = state.store.as_ref();
    let total = CrudService::count::<Hospital>(store, &params.query.filter).await?;
    let hospitals = CrudService::list::<Hospital>(store, &params.query).await?;
    Ok(success_page(hospitals, total, params.pagination(total)))
}

#[utoipa::path(
    get,
    path = "/hospitals/{id}",
    tag = "hospitals",
    params(("id" = String, Path, description = "Hospital id")),
    responses(
        (status = 200, description = "The hospital", body = SuccessOne<Hospital>),
        (status = 404, description = "No such hospital"),
    )
)]
pub async fn get_hospital(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id::<Hospital>(&id)?;
    let hospital = CrudService::get::<Hospital>(state.store.as_ref(), id).await?;
    Ok(success_one_ok(hospital))
}

#[utoipa::path(
    post,
    path = "/hospitals",
    tag = "hospitals",
    request_body = HospitalInput,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created", body = SuccessOne<Hospital>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Name already taken"),
    )
)]
pub async fn create_hospital(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let body = prepare(body);
    RequestValidator::validate(&body, Hospital::RULES)?;
    let hospital = CrudService::create::<Hospital>(state.store.as_ref(), body).await?;
    Ok(success_one(hospital))
}

#[utoipa::path(
    put,
    path = "/hospitals/{id}",
    tag = "hospitals",
    params(("id" = String, Path, description = "Hospital id")),
    request_body = HospitalInput,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated", body = SuccessOne<Hospital>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such hospital"),
        (status = 409, description = "Name already taken"),
    )
)]
pub async fn update_hospital(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id::<Hospital>(&id)?;
    let body = prepare(body);
    RequestValidator::validate_partial(&body, Hospital::RULES)?;
    let hospital = CrudService::update::<Hospital>(state.store.as_ref(), id, body).await?;
    Ok(success_one_ok(hospital))
}

/// Removes the hospital and every appointment booked at it.
#[utoipa::path(
    delete,
    path = "/hospitals/{id}",
    tag = "hospitals",
    params(("id" = String, Path, description = "Hospital id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Deleted", body = SuccessOne<Empty>),
        (status = 404, description = "No such hospital"),
    )
)]
pub async fn delete_hospital(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id::<Hospital>(&id)?;
    let store = state.store.as_ref();
    let hospital = CrudService::delete::<Hospital>(store, id).await?;

    let mut filter = Map::new();
    filter.insert("hospital".into(), Value::String(hospital.id.to_string()));
    let removed = CrudService::delete_where::<Appointment>(store, &filter).await?;
    tracing::info!(hospital = %hospital.id, appointments = removed, "hospital removed with its appointments");

    Ok(success_one_ok(Empty {}))
}

fn prepare(mut body: Map<String, Value>) -> Map<String, Value> {
    retain_known(&mut body, Hospital::RULES);
    trim_strings(&mut body);
    body
}
