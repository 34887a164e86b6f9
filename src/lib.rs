//! Sloth REST
//!
//! Assembles an HTTP API at startup from self-describing domain modules and
//! guards it with an admission-control pipeline (CORS, KV-backed rate
//! limiting, security headers, bearer authentication, error normalization).
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   API Layer                  │
//! │  Middlewares, documentation, router setup    │
//! ├─────────────────────────────────────────────┤
//! │               Application Layer              │
//! │  Config, builders, loader, OpenAPI, limiter  │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │  Types, deep merge, errors, KvStore trait    │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │  In-memory KV store, logging, metrics        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Domain modules live in [`domains`] and are listed explicitly in
//! [`domains::registry`]; nothing is discovered from the filesystem.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sloth_rest::api::create_router;
//! use sloth_rest::app::{AppConfig, AppState, Loader};
//! use sloth_rest::infra::MemoryKvStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryKvStore::open(Duration::from_secs(30));
//!     let state = Arc::new(AppState::new(AppConfig::from_env()?, store));
//!
//!     let assembly = Loader::new(sloth_rest::domains::registry()).load().await?;
//!     let router = create_router(state, &assembly)?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod domain;
pub mod domains;
pub mod infra;

// Test utilities are available in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
