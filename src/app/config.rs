//! Runtime configuration read from the environment.
//!
//! Every key has a code-level default. Empty values count as unset.

use std::fmt::Display;
use std::str::FromStr;

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::domain::ConfigError;
use crate::infra::LogFormat;

/// Deployment environment. Anything other than `production` is development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per caller and window
    pub max: u64,
    /// Window length in milliseconds
    pub window_ms: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: 100,
            window_ms: 60_000,
        }
    }
}

/// Application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: Environment,
    pub port: u16,
    pub doc_path: String,
    pub ui_path: String,
    pub metrics_path: String,
    /// Expected bearer token; `None` disables authentication unless
    /// `auth_fail_closed` is set.
    pub bearer_token: Option<SecretString>,
    /// Allowed CORS origin in production.
    pub app_url: String,
    /// Mount prefix of every domain route, without trailing slash.
    pub base_url: String,
    pub rate_limit: RateLimitConfig,
    pub auth_fail_closed: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Unknown App".to_string(),
            environment: Environment::Production,
            port: 8000,
            doc_path: "/doc".to_string(),
            ui_path: "/ui".to_string(),
            metrics_path: "/metrics".to_string(),
            bearer_token: None,
            app_url: "http://localhost:8000".to_string(),
            base_url: "/app".to_string(),
            rate_limit: RateLimitConfig::default(),
            auth_fail_closed: false,
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    /// Create config from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let environment = read("ENV")
            .map(|name| Environment::from_name(&name))
            .unwrap_or(defaults.environment);

        let app_url = read("APP_URL").unwrap_or(defaults.app_url);
        HeaderValue::from_str(&app_url).map_err(|e| ConfigError::InvalidValue {
            key: "APP_URL".to_string(),
            message: e.to_string(),
        })?;

        let log_format = match read("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT".to_string(),
                    message: format!("expected 'json' or 'pretty', got '{other}'"),
                });
            }
            None if environment.is_production() => LogFormat::Json,
            None => LogFormat::Pretty,
        };

        let window_ms: i64 = parse_or(&read, "RATE_LIMIT_WINDOW_MS", defaults.rate_limit.window_ms)?;
        if window_ms <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_WINDOW_MS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let doc_path = route_path(&read, "DOC_PATH", defaults.doc_path)?;
        let ui_path = route_path(&read, "UI_PATH", defaults.ui_path)?;
        let metrics_path = route_path(&read, "METRICS_PATH", defaults.metrics_path)?;
        distinct_path("UI_PATH", &ui_path, &[doc_path.as_str()])?;
        distinct_path("METRICS_PATH", &metrics_path, &[doc_path.as_str(), ui_path.as_str()])?;

        Ok(Self {
            app_name: read("APP_NAME").unwrap_or(defaults.app_name),
            environment,
            port: parse_or(&read, "APP_PORT", defaults.port)?,
            doc_path,
            ui_path,
            metrics_path,
            bearer_token: read("BEARER_TOKEN").map(SecretString::from),
            app_url,
            base_url: normalize_base_url(&read("BASE_URL").unwrap_or(defaults.base_url))?,
            rate_limit: RateLimitConfig {
                max: parse_or(&read, "RATE_LIMIT_MAX", defaults.rate_limit.max)?,
                window_ms,
            },
            auth_fail_closed: parse_or(&read, "AUTH_FAIL_CLOSED", defaults.auth_fail_closed)?,
            log_format,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

fn parse_or<T>(
    read: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match read(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn route_path(
    read: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: String,
) -> Result<String, ConfigError> {
    let path = read(key).unwrap_or(default);
    if !path.starts_with('/') {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{path}' must start with '/'"),
        });
    }
    Ok(path)
}

// Doc, UI and metrics endpoints share one router and must not overlap.
fn distinct_path(key: &str, path: &str, taken: &[&str]) -> Result<(), ConfigError> {
    if taken.contains(&path) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{path}' is already used by another built-in endpoint"),
        });
    }
    Ok(())
}

/// `/app/` becomes `/app`, `/` becomes the empty prefix.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.is_empty() && !trimmed.starts_with('/') {
        return Err(ConfigError::InvalidValue {
            key: "BASE_URL".to_string(),
            message: format!("'{raw}' must start with '/'"),
        });
    }
    Ok(trimmed.to_string())
}
