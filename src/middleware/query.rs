//! Query-string decoding and re-encoding shared by the sanitizers.

use crate::error::AppError;
use axum::{
    extract::Request,
    http::{uri::PathAndQuery, Uri},
};

pub fn query_pairs(req: &Request) -> Result<Vec<(String, String)>, AppError> {
    match req.uri().query() {
        Some(q) if !q.is_empty() => serde_urlencoded::from_str(q)
            .map_err(|e| AppError::BadRequest(format!("malformed query string: {}", e))),
        _ => Ok(Vec::new()),
    }
}

/// Replace the request's query string with `pairs`.
pub fn set_query(req: &mut Request, pairs: &[(String, String)]) -> Result<(), AppError> {
    let encoded = serde_urlencoded::to_string(pairs)
        .map_err(|e| AppError::Internal(format!("encode query: {}", e)))?;
    let path = req.uri().path();
    let pq = if encoded.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, encoded)
    };
    let mut uri_parts = req.uri().clone().into_parts();
    uri_parts.path_and_query =
        Some(PathAndQuery::try_from(pq).map_err(|e| AppError::BadRequest(format!("invalid uri: {}", e)))?);
    *req.uri_mut() = Uri::from_parts(uri_parts).map_err(|e| AppError::BadRequest(format!("invalid uri: {}", e)))?;
    Ok(())
}

/// Run `f` over the query pairs and write them back when they changed.
pub fn rewrite_query<F>(req: &mut Request, f: F) -> Result<(), AppError>
where
    F: FnOnce(Vec<(String, String)>) -> Vec<(String, String)>,
{
    let pairs = query_pairs(req)?;
    if pairs.is_empty() {
        return Ok(());
    }
    let rewritten = f(pairs.clone());
    if rewritten != pairs {
        set_query(req, &rewritten)?;
    }
    Ok(())
}
