//! Shared application state for all routes.

use crate::auth::{RoutePolicy, TokenService};
use crate::db::SharedStore;
use crate::middleware::rate_limit::RateLimiter;
use crate::settings::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub policy: Arc<RoutePolicy>,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: SharedStore, config: AppConfig) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expire);
        let limiter = RateLimiter::new(config.rate_limit.clone());
        AppState {
            store,
            config: Arc::new(config),
            tokens,
            policy: Arc::new(RoutePolicy::standard()),
            limiter,
        }
    }
}
