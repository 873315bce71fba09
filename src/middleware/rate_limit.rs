//! Fixed-window rate limiting per client address.

use crate::error::AppError;
use crate::settings::RateLimitSettings;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Above this many tracked clients, expired windows are pruned on each check.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Clone, Copy, Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window closes.
    pub reset_secs: u64,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            settings,
        }
    }

    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let window_len = self.settings.window;
        let mut windows = self.windows.lock().await;
        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < window_len);
        }
        let w = windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(w.started) >= window_len {
            *w = Window { started: now, count: 0 };
        }
        w.count = w.count.saturating_add(1);
        let limit = self.settings.max_requests;
        let elapsed = now.duration_since(w.started);
        let reset = window_len.saturating_sub(elapsed);
        Decision {
            allowed: w.count <= limit,
            limit,
            remaining: limit.saturating_sub(w.count),
            reset_secs: ceil_secs(reset),
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// The peer address. Behind a trusted proxy, the first `X-Forwarded-For` hop wins.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".into())
}

fn set_headers(headers: &mut HeaderMap, d: &Decision) {
    let pairs = [
        ("ratelimit-limit", d.limit as u64),
        ("ratelimit-remaining", d.remaining as u64),
        ("ratelimit-reset", d.reset_secs),
    ];
    for (name, value) in pairs {
        if let Ok(v) = HeaderValue::from_str(&value.to_string()) {
            headers.insert(HeaderName::from_static(name), v);
        }
    }
}

pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
    let key = client_key(req.headers(), peer, state.config.trust_proxy);
    let decision = state.limiter.check(&key).await;

    let mut res = if decision.allowed {
        next.run(req).await
    } else {
        tracing::warn!(client = %key, limit = decision.limit, "rate limit exceeded");
        AppError::RateLimited {
            retry_after_secs: decision.reset_secs,
        }
        .into_response()
    };
    set_headers(res.headers_mut(), &decision);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitSettings {
            max_requests: max,
            window: Duration::from_secs(secs),
        })
    }

    #[tokio::test]
    async fn excess_requests_are_refused_until_window_resets() {
        let rl = limiter(2, 600);
        let t0 = Instant::now();
        assert!(rl.check_at("a", t0).await.allowed);
        let second = rl.check_at("a", t0).await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        let third = rl.check_at("a", t0 + Duration::from_secs(1)).await;
        assert!(!third.allowed);
        assert_eq!(third.reset_secs, 599);
        // other clients are unaffected
        assert!(rl.check_at("b", t0).await.allowed);
        // next window
        assert!(rl.check_at("a", t0 + Duration::from_secs(600)).await.allowed);
    }

    #[test]
    fn client_key_uses_forwarded_for_only_behind_a_proxy() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.9:4000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer), false), "10.0.0.9");
        assert_eq!(client_key(&headers, None, false), "unknown");
        assert_eq!(client_key(&headers, Some(peer), true), "10.0.0.9");
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&headers, Some(peer), false), "10.0.0.9");
        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");
    }
}
