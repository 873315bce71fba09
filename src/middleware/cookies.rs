//! Cookie parsing and the session token cookie.

use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::time::Duration;

/// Parse the `Cookie` header once and attach the jar to the request.
pub async fn parse_cookies(mut req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    req.extensions_mut().insert(jar);
    next.run(req).await
}

/// Cookie value from the parsed jar, or straight from the header when the parser did not run.
pub fn request_cookie(req: &Request, name: &str) -> Option<String> {
    match req.extensions().get::<CookieJar>() {
        Some(jar) => jar.get(name).map(|c| c.value().to_string()),
        None => CookieJar::from_headers(req.headers())
            .get(name)
            .map(|c| c.value().to_string()),
    }
}

pub fn session_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .build()
}

/// Overwrites the session cookie with one that expires immediately.
pub fn clear_cookie(name: &str, secure: bool) -> Cookie<'static> {
    session_cookie(name, "none", Duration::ZERO, secure)
}
