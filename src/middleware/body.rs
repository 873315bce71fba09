//! Body parsing: buffer up to the limit, parse JSON once, and let later stages rewrite it.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

/// The parsed JSON body, present when the request declared a JSON content type.
#[derive(Clone, Debug)]
pub struct ParsedJson(pub Value);

fn is_json(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

pub async fn parse_body(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, AppError> {
    let limit = state.config.body_limit_bytes;
    let (mut parts, body) = req.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.map(|n| n > limit).unwrap_or(false) {
        return Err(AppError::PayloadTooLarge { limit });
    }
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| AppError::PayloadTooLarge { limit })?;

    if is_json(&parts) && !bytes.is_empty() {
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("malformed JSON body: {}", e)))?;
        parts.extensions.insert(ParsedJson(value));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Apply `f` to the parsed JSON body, if any, and re-encode it into a fresh body.
pub fn rewrite_json<F>(req: Request, f: F) -> Result<Request, AppError>
where
    F: FnOnce(&mut Value),
{
    let (mut parts, body) = req.into_parts();
    let Some(ParsedJson(value)) = parts.extensions.get_mut::<ParsedJson>() else {
        return Ok(Request::from_parts(parts, body));
    };
    f(value);
    let bytes = Bytes::from(serde_json::to_vec(value).map_err(|e| AppError::Internal(format!("re-encode body: {}", e)))?);
    if let Ok(len) = HeaderValue::from_str(&bytes.len().to_string()) {
        parts.headers.insert(header::CONTENT_LENGTH, len);
    }
    Ok(Request::from_parts(parts, Body::from(bytes)))
}
