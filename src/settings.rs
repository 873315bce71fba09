//! Process configuration, loaded once at startup from the environment.
//!
//! Sources, first match wins: process environment, `.env`, `config/config.env`.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "vacq-dev-secret";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expire: Duration,
    pub jwt_cookie_expire: Duration,
    pub rate_limit: RateLimitSettings,
    pub body_limit_bytes: usize,
    pub allow_admin_signup: bool,
    pub max_appointments_per_user: usize,
    /// Query keys allowed to repeat (kept as-is by the pollution guard).
    pub hpp_whitelist: Vec<String>,
    /// Key clients by the first `X-Forwarded-For` hop instead of the peer address.
    pub trust_proxy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            environment: Environment::Development,
            database_url: None,
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.into(),
            jwt_expire: Duration::from_secs(30 * 24 * 3600),
            jwt_cookie_expire: Duration::from_secs(30 * 24 * 3600),
            rate_limit: RateLimitSettings::default(),
            body_limit_bytes: 100 * 1024,
            allow_admin_signup: false,
            max_appointments_per_user: 3,
            hpp_whitelist: Vec::new(),
            trust_proxy: false,
        }
    }
}

impl AppConfig {
    /// Load dotenv files (if present) and read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        dotenvy::from_path("config/config.env").ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
            Some(v) => v.parse()?,
            None => defaults.environment,
        };
        let database_url = get("DATABASE_URL");
        if environment.is_production() && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        let jwt_secret = match get("JWT_SECRET") {
            Some(s) => s,
            None if environment.is_production() => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure development default");
                defaults.jwt_secret
            }
        };

        let rate_limit = RateLimitSettings {
            max_requests: parse_or("RATE_LIMIT_MAX", get("RATE_LIMIT_MAX"), defaults.rate_limit.max_requests)?,
            window: Duration::from_secs(parse_or(
                "RATE_LIMIT_WINDOW_SECS",
                get("RATE_LIMIT_WINDOW_SECS"),
                defaults.rate_limit.window.as_secs(),
            )?),
        };

        let jwt_expire = match get("JWT_EXPIRE") {
            Some(v) => parse_duration(&v).ok_or(ConfigError::Invalid { key: "JWT_EXPIRE", value: v })?,
            None => defaults.jwt_expire,
        };
        let cookie_days: u64 = parse_or("JWT_COOKIE_EXPIRE", get("JWT_COOKIE_EXPIRE"), 30)?;

        let hpp_whitelist = get("HPP_WHITELIST")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(AppConfig {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            environment,
            database_url,
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            )?,
            jwt_secret,
            jwt_expire,
            jwt_cookie_expire: Duration::from_secs(cookie_days * 24 * 3600),
            rate_limit,
            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", get("BODY_LIMIT_BYTES"), defaults.body_limit_bytes)?,
            allow_admin_signup: parse_or("ALLOW_ADMIN_SIGNUP", get("ALLOW_ADMIN_SIGNUP"), false)?,
            max_appointments_per_user: parse_or(
                "MAX_APPOINTMENTS_PER_USER",
                get("MAX_APPOINTMENTS_PER_USER"),
                defaults.max_appointments_per_user,
            )?,
            hpp_whitelist,
            trust_proxy: parse_or("TRUST_PROXY", get("TRUST_PROXY"), false)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "HOST",
                value: self.host.clone(),
            })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

/// Parse `90`, `90s`, `15m`, `12h` or `30d`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (num, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => s.split_at(i),
        None => (s, "s"),
    };
    let n: u64 = num.parse().ok()?;
    let secs = match unit {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86_400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
