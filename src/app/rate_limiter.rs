//! Per-caller window rate limiter backed by the KV store.
//!
//! Each caller identity owns one [`RateLimitRecord`] under
//! `["ratelimit", identity]` in the store's window namespace. Every admitted
//! request moves the record's timestamp to now, and the window lapses once
//! `window_ms` passed since the last admitted request. Refused requests do
//! not touch the record. Counting goes through [`KvStore::increment_window`],
//! so concurrent requests from one caller never both observe a stale count.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    AdmissionDecision, AdmissionRejection, KvKey, KvStore, RateLimitRecord, StoreError,
};

use super::config::RateLimitConfig;

/// Verdict plus the numbers reported in the rate limit headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub decision: AdmissionDecision,
    pub limit: u64,
    pub remaining: u64,
}

#[derive(Clone)]
pub struct KvRateLimiter {
    store: Arc<dyn KvStore>,
    config: RateLimitConfig,
}

impl KvRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn key_for(identity: &str) -> KvKey {
        KvKey::new(["ratelimit", identity])
    }

    /// Counts one request from `identity` against the current window.
    pub async fn check(&self, identity: &str) -> Result<RateLimitStatus, StoreError> {
        self.check_at(identity, Utc::now().timestamp_millis()).await
    }

    /// [`check`](Self::check) with an explicit clock.
    pub async fn check_at(
        &self,
        identity: &str,
        now_ms: i64,
    ) -> Result<RateLimitStatus, StoreError> {
        let hit = self
            .store
            .increment_window(
                &Self::key_for(identity),
                now_ms,
                self.config.window_ms,
                self.config.max,
            )
            .await?;

        let decision = if hit.admitted {
            AdmissionDecision::Pass
        } else {
            AdmissionDecision::Reject(AdmissionRejection::RateLimited {
                retry_after_secs: self.retry_after_secs(&hit.record, now_ms),
            })
        };

        Ok(RateLimitStatus {
            decision,
            limit: self.config.max,
            remaining: self.config.max.saturating_sub(hit.record.count),
        })
    }

    /// Whole seconds until the window of `record` lapses, at least one.
    fn retry_after_secs(&self, record: &RateLimitRecord, now_ms: i64) -> u64 {
        let reset_at = record
            .window_start_millis
            .saturating_add(self.config.window_ms)
            .saturating_add(1);
        let wait_ms = u64::try_from(reset_at.saturating_sub(now_ms)).unwrap_or(0);
        wait_ms.div_ceil(1000).max(1)
    }
}

impl std::fmt::Debug for KvRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
