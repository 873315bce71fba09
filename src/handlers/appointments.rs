//! Appointment handlers. Non-admin callers only ever see and touch their own bookings.

use crate::auth::Identity;
use crate::error::AppError;
use crate::extractors::{CurrentUser, JsonBody};
use crate::models::{
    Appointment, AppointmentInput, AppointmentView, Hospital, HospitalSummary, Resource, User,
};
use crate::response::{success_one, success_one_ok, success_page, Empty, SuccessMany, SuccessOne};
use crate::service::crud::{not_found, parse_id};
use crate::service::validation::{retain_known, trim_strings};
use crate::service::{CrudService, ListParams, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/appointments",
    tag = "appointments",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("limit" = Option<u64>, Query, description = "Page size, at most 100"),
        ("sort" = Option<String>, Query, description = "Comma-separated fields, `-` prefix for descending"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's appointments, or all for admins", body = SuccessMany<AppointmentView>),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    list_scoped(&state, &caller, None, &params).await
}

#[utoipa::path(
    get,
    path = "/hospitals/{id}/appointments",
    tag = "appointments",
    params(("id" = String, Path, description = "Hospital id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Appointments at this hospital", body = SuccessMany<AppointmentView>),
        (status = 404, description = "No such hospital"),
    )
)]
pub async fn list_hospital_appointments(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let hospital_id = parse_id::<Hospital>(&id)?;
    CrudService::get::<Hospital>(state.store.as_ref(), hospital_id).await?;
    list_scoped(&state, &caller, Some(hospital_id), &params).await
}

async fn list_scoped(
    state: &AppState,
    caller: &Identity,
    hospital: Option<Uuid>,
    params: &HashMap<String, String>,
) -> Result<impl IntoResponse, AppError> {
    let mut params = ListParams::from_query(params, Appointment::RULES)?;
    if !caller.is_admin() {
        params.query.filter.insert("user".into(), Value::String(caller.id.to_string()));
    }
    if let Some(h) = hospital {
        params.query.filter.insert("hospital".into(), Value::String(h.to_string()));
    }

    let store = state.store.as_ref();
    let total = CrudService::count::<Appointment>(store, &params.query.filter).await?;
    let appointments = CrudService::list::<Appointment>(store, &params.query).await?;

    let mut hospitals: HashMap<Uuid, Option<HospitalSummary>> = HashMap::new();
    let mut views = Vec::with_capacity(appointments.len());
    for appt in appointments {
        if !hospitals.contains_key(&appt.hospital) {
            let summary = CrudService::read::<Hospital>(store, appt.hospital)
                .await?
                .map(|h| HospitalSummary::from(&h));
            hospitals.insert(appt.hospital, summary);
        }
        let summary = hospitals.get(&appt.hospital).cloned().flatten();
        views.push(AppointmentView::new(appt, summary));
    }
    Ok(success_page(views, total, params.pagination(total)))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = String, Path, description = "Appointment id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The appointment", body = SuccessOne<AppointmentView>),
        (status = 403, description = "Belongs to another user"),
        (status = 404, description = "No such appointment"),
    )
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let appt = owned_appointment(&state, &caller, &id).await?;
    Ok(success_one_ok(populate(&state, appt).await?))
}

#[utoipa::path(
    post,
    path = "/appointments",
    tag = "appointments",
    request_body = AppointmentInput,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Booked", body = SuccessOne<AppointmentView>),
        (status = 400, description = "Validation failed or booking limit reached"),
        (status = 404, description = "Hospital or user does not exist"),
    )
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    book(&state, &caller, None, body).await
}

#[utoipa::path(
    post,
    path = "/hospitals/{id}/appointments",
    tag = "appointments",
    params(("id" = String, Path, description = "Hospital id")),
    request_body = AppointmentInput,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Booked", body = SuccessOne<AppointmentView>),
        (status = 400, description = "Validation failed or booking limit reached"),
        (status = 404, description = "Hospital or user does not exist"),
    )
)]
pub async fn create_hospital_appointment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let hospital_id = parse_id::<Hospital>(&id)?;
    book(&state, &caller, Some(hospital_id), body).await
}

async fn book(
    state: &AppState,
    caller: &Identity,
    hospital: Option<Uuid>,
    mut body: Map<String, Value>,
) -> Result<impl IntoResponse, AppError> {
    retain_known(&mut body, Appointment::RULES);
    trim_strings(&mut body);
    if let Some(h) = hospital {
        body.insert("hospital".into(), Value::String(h.to_string()));
    }
    if !caller.is_admin() || !body.contains_key("user") {
        body.insert("user".into(), Value::String(caller.id.to_string()));
    }
    RequestValidator::validate(&body, Appointment::RULES)?;

    let store = state.store.as_ref();
    let hospital_id = field_id::<Hospital>(&body, "hospital")?;
    let hospital = CrudService::get::<Hospital>(store, hospital_id).await?;
    let user_id = field_id::<User>(&body, "user")?;
    CrudService::get::<User>(store, user_id).await?;

    if !caller.is_admin() {
        let max = state.config.max_appointments_per_user;
        let mut mine = Map::new();
        mine.insert("user".into(), Value::String(caller.id.to_string()));
        let held = CrudService::count::<Appointment>(store, &mine).await?;
        if held >= max as u64 {
            return Err(AppError::Validation(format!(
                "the user with id {} has already made {} appointments",
                caller.id, max
            )));
        }
    }

    let appt = CrudService::create::<Appointment>(store, body).await?;
    Ok(success_one(AppointmentView::new(appt, Some(HospitalSummary::from(&hospital)))))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = AppointmentInput,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated", body = SuccessOne<AppointmentView>),
        (status = 403, description = "Belongs to another user"),
        (status = 404, description = "No such appointment, hospital or user"),
    )
)]
pub async fn update_appointment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    JsonBody(mut body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let appt = owned_appointment(&state, &caller, &id).await?;
    retain_known(&mut body, Appointment::RULES);
    trim_strings(&mut body);
    if !caller.is_admin() {
        body.remove("user");
    }
    RequestValidator::validate_partial(&body, Appointment::RULES)?;

    let store = state.store.as_ref();
    if body.contains_key("hospital") {
        CrudService::get::<Hospital>(store, field_id::<Hospital>(&body, "hospital")?).await?;
    }
    if body.contains_key("user") {
        CrudService::get::<User>(store, field_id::<User>(&body, "user")?).await?;
    }

    let updated = CrudService::update::<Appointment>(store, appt.id, body).await?;
    Ok(success_one_ok(populate(&state, updated).await?))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = String, Path, description = "Appointment id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Deleted", body = SuccessOne<Empty>),
        (status = 403, description = "Belongs to another user"),
        (status = 404, description = "No such appointment"),
    )
)]
pub async fn delete_appointment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let appt = owned_appointment(&state, &caller, &id).await?;
    CrudService::delete::<Appointment>(state.store.as_ref(), appt.id).await?;
    Ok(success_one_ok(Empty {}))
}

/// Load an appointment the caller may act on. Admins may act on any.
async fn owned_appointment(state: &AppState, caller: &Identity, raw_id: &str) -> Result<Appointment, AppError> {
    let id = parse_id::<Appointment>(raw_id)?;
    let appt = CrudService::get::<Appointment>(state.store.as_ref(), id).await?;
    if !caller.is_admin() && appt.user != caller.id {
        tracing::warn!(user = %caller.id, appointment = %appt.id, "appointment owned by another user");
        return Err(AppError::Forbidden(format!(
            "user {} is not authorized to access this appointment",
            caller.id
        )));
    }
    Ok(appt)
}

async fn populate(state: &AppState, appt: Appointment) -> Result<AppointmentView, AppError> {
    let hospital = CrudService::read::<Hospital>(state.store.as_ref(), appt.hospital).await?;
    Ok(AppointmentView::new(appt, hospital.as_ref().map(HospitalSummary::from)))
}

/// A validated UUID field of the body. Ids that name nothing surface as `NotFound` for `T`.
fn field_id<T: Resource>(body: &Map<String, Value>, field: &str) -> Result<Uuid, AppError> {
    let raw = body
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))?;
    Uuid::parse_str(raw).map_err(|_| not_found::<T>(raw))
}
