//! Domain traits defining contracts for external systems.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::StoreError;
use super::types::{KvKey, WindowHit};

/// Key-value storage shared by the rate limiter and the domain handlers.
///
/// Opened once at process start and passed explicitly; `close` is called at
/// shutdown, after which every operation fails with [`StoreError::Closed`].
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Check store availability
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Read a live value
    async fn get(&self, key: &KvKey) -> Result<Option<Value>, StoreError>;

    /// Write a value, optionally expiring after `expire_in`
    async fn set(
        &self,
        key: &KvKey,
        value: Value,
        expire_in: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Remove a value, returning whether it existed
    async fn delete(&self, key: &KvKey) -> Result<bool, StoreError>;

    /// List live entries whose key starts with `prefix`, in key order
    async fn list(&self, prefix: &KvKey) -> Result<Vec<(KvKey, Value)>, StoreError>;

    /// Atomically count one hit against the rate limit window at `key`.
    ///
    /// Windows live in their own namespace: `get`, `set`, `delete` and
    /// `list` never see them. An absent window, or one whose record predates
    /// `now_ms - window_ms`, restarts at `{count: 1, window_start_millis:
    /// now_ms}`. Below `max` the count goes up by one and the start moves to
    /// `now_ms`. At `max` the hit is refused and the window is left as is.
    /// Written windows expire `window_ms` after `now_ms`.
    async fn increment_window(
        &self,
        key: &KvKey,
        now_ms: i64,
        window_ms: i64,
        max: u64,
    ) -> Result<WindowHit, StoreError>;

    /// Release resources held by the store
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
