//! Route guard: authenticate, then authorize against the route policy.

use super::policy::{authorize, Access};
use super::{Identity, TokenError};
use crate::app::API_PREFIX;
use crate::error::AppError;
use crate::middleware::cookies::request_cookie;
use crate::models::User;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

pub const TOKEN_COOKIE: &str = "token";

pub async fn guard(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let Some(path) = req.extensions().get::<MatchedPath>().map(|m| m.as_str().to_string()) else {
        tracing::error!(uri = %req.uri(), "guard reached without a matched route");
        return Err(AppError::Forbidden("route has no access policy".into()));
    };
    let Some(access) = state.policy.lookup(req.method(), &path, API_PREFIX) else {
        tracing::error!(method = %req.method(), path = %path, "route missing from access policy");
        return Err(AppError::Forbidden("route has no access policy".into()));
    };

    if let Access::Roles(_) = access {
        let token = extract_token(&req).ok_or(AppError::Unauthorized)?;
        let identity = authenticate(&state, &token).await?;
        if !authorize(access, identity.role) {
            tracing::warn!(user = %identity.id, role = %identity.role, path = %path, "role not permitted");
            return Err(AppError::Forbidden(format!(
                "user role {} is not authorized to access this route",
                identity.role
            )));
        }
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}

/// Verify the token and resolve the user it names.
pub async fn authenticate(state: &AppState, token: &str) -> Result<Identity, AppError> {
    let claims = state.tokens.verify(token).map_err(|e| {
        match e {
            TokenError::Expired => tracing::debug!("expired token"),
            TokenError::Invalid => tracing::debug!("invalid token"),
        }
        AppError::Unauthorized
    })?;
    let user = CrudService::read::<User>(state.store.as_ref(), claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Identity::from(&user))
}

/// Bearer header first, then the session cookie.
fn extract_token(req: &Request) -> Option<String> {
    bearer(req.headers()).or_else(|| request_cookie(req, TOKEN_COOKIE))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer(&headers).as_deref(), Some("abc.def"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer(&headers), None);
    }
}
