//! The API layer, containing web handlers, middlewares and routing.

pub mod handlers;
pub mod middleware;
pub mod router;

pub use router::{create_router, router_from_api};
