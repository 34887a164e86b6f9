//! Application layer: configuration, shared state and API assembly.

pub mod config;
pub mod loader;
pub mod openapi;
pub mod rate_limiter;
pub mod registry;
pub mod route;
pub mod state;

pub use config::{AppConfig, Environment, RateLimitConfig};
pub use loader::{Assembly, DomainModule, Loader, LoaderState, ModuleRegistry, RouteModule};
pub use openapi::{AssembledApi, DispatchTable, DocumentMeta, assemble, build_document};
pub use rate_limiter::{KvRateLimiter, RateLimitStatus};
pub use registry::{Domain, DomainBuilder};
pub use route::{Route, RouteBuilder, RouteSchema};
pub use state::{AppState, SharedState};
