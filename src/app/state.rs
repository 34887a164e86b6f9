//! Application state management.
//!
//! This module provides the shared application state that is
//! accessible to all request handlers via Axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use crate::domain::KvStore;
use crate::infra::PrometheusHandle;

use super::config::AppConfig;

/// Shared application state for the Axum web server.
///
/// The store is the explicitly passed storage dependency: the binary opens
/// it before assembly and closes it after the server stops.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn KvStore>,
    /// Prometheus handle, present when a recorder was installed.
    pub metrics: Option<Arc<PrometheusHandle>>,
    pub started_at: Instant,
}

impl AppState {
    /// Creates a new `AppState` from configuration and a store.
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    /// Attaches a Prometheus handle so the metrics endpoint gets mounted.
    #[must_use]
    pub fn with_metrics(mut self, handle: Arc<PrometheusHandle>) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// State type every route handler receives.
pub type SharedState = Arc<AppState>;
