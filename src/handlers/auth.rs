//! Registration, sign-in and session cookie handling.

use crate::auth::guard::TOKEN_COOKIE;
use crate::auth::{hash_password, verify_password};
use crate::error::AppError;
use crate::extractors::{CurrentUser, JsonBody};
use crate::middleware::cookies::{clear_cookie, session_cookie};
use crate::models::{RegisterInput, Resource, Role, User, UserView};
use crate::response::{Empty, SuccessData, TokenBody};
use crate::service::validation::{retain_known, trim_strings};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginInput {
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterInput,
    responses(
        (status = 200, description = "Registered and signed in; also sets the `token` cookie", body = TokenBody),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn register(State(state): State<AppState>, JsonBody(mut body): JsonBody) -> Result<Response, AppError> {
    retain_known(&mut body, User::RULES);
    let password = body.remove("password");
    trim_strings(&mut body);
    if let Some(p) = password {
        body.insert("password".into(), p);
    }
    RequestValidator::validate(&body, User::RULES)?;

    let wants_admin = body.get("role").and_then(Value::as_str) == Some(Role::Admin.as_str());
    if wants_admin && !state.config.allow_admin_signup {
        return Err(AppError::Validation("role admin cannot be self-assigned".into()));
    }
    body.entry("role")
        .or_insert_with(|| Value::String(Role::User.as_str().into()));

    let plain = body
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation("password is required".into()))?;
    let hash = hash_password(plain)?;
    body.insert("password".into(), Value::String(hash));

    let user = CrudService::create::<User>(state.store.as_ref(), body).await?;
    tracing::info!(user = %user.id, role = %user.role, "user registered");
    send_token(&state, &user)
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Signed in; also sets the `token` cookie", body = TokenBody),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(State(state): State<AppState>, JsonBody(body): JsonBody) -> Result<Response, AppError> {
    let email = non_empty(&body, "email");
    let password = non_empty(&body, "password");
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::Validation("please provide an email and password".into()));
    };

    let mut filter = Map::new();
    filter.insert("email".into(), Value::String(email.trim().to_string()));
    let Some(user) = CrudService::find_one::<User>(state.store.as_ref(), filter).await? else {
        tracing::debug!("login for unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash)? {
        tracing::debug!(user = %user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }
    send_token(&state, &user)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The signed-in user", body = SuccessData<UserView>),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn me(State(state): State<AppState>, CurrentUser(caller): CurrentUser) -> Result<impl IntoResponse, AppError> {
    let user = CrudService::get::<User>(state.store.as_ref(), caller.id).await?;
    Ok(Json(SuccessData {
        success: true,
        data: UserView::from(user),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Cookie cleared", body = SuccessData<Empty>))
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let jar = CookieJar::default().add(clear_cookie(TOKEN_COOKIE, state.config.environment.is_production()));
    (
        StatusCode::OK,
        jar,
        Json(SuccessData {
            success: true,
            data: Empty {},
        }),
    )
}

fn send_token(state: &AppState, user: &User) -> Result<Response, AppError> {
    let token = state.tokens.issue(user.id)?;
    let cookie = session_cookie(
        TOKEN_COOKIE,
        &token,
        state.config.jwt_cookie_expire,
        state.config.environment.is_production(),
    );
    Ok((
        StatusCode::OK,
        CookieJar::default().add(cookie),
        Json(TokenBody { success: true, token }),
    )
        .into_response())
}

fn non_empty<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}
