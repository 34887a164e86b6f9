//! Application error types with proper error chaining.

use thiserror::Error;

use super::types::AdmissionRejection;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store is closed")]
    Closed,
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
    #[error("Invalid TTL: must be > 0")]
    InvalidTtl,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Startup-time failures while discovering domains and registering routes.
/// All of them abort the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Domain factory '{module}' failed: {message}")]
    DomainFactory { module: String, message: String },
    #[error("Domain '{0}' must be created without routes")]
    DomainNotEmpty(String),
    #[error("Domain '{0}' is declared more than once")]
    DuplicateDomain(String),
    #[error("Route registration failed in domain '{domain}': {message}")]
    RouteRegistration { domain: String, message: String },
    #[error("Route {method} {path} is registered more than once")]
    DuplicateRoute { method: String, path: String },
    #[error("Invalid route path '{path}': {message}")]
    InvalidPath { path: String, message: String },
    #[error("Modules have already been assembled")]
    AlreadyAssembled,
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Validation failed: {0}")]
    Multiple(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Authentication(String),
    #[error("Forbidden: {0}")]
    Authorization(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Multiple(err.to_string()))
    }
}

impl From<AdmissionRejection> for AppError {
    fn from(rejection: AdmissionRejection) -> Self {
        match rejection {
            AdmissionRejection::MissingCredential => {
                AppError::Authentication("missing Bearer token".to_string())
            }
            AdmissionRejection::InvalidCredential => {
                AppError::Authorization("invalid Bearer token".to_string())
            }
            AdmissionRejection::RateLimited { retry_after_secs } => {
                AppError::RateLimited { retry_after_secs }
            }
        }
    }
}
