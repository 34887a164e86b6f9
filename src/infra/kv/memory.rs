//! In-process KV store with per-entry expiry.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{KvKey, KvStore, RateLimitRecord, StoreError, WindowHit};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at_ms: Option<i64>,
}

impl Entry {
    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_none_or(|at| now_ms <= at)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    record: RateLimitRecord,
    expires_at_ms: i64,
}

#[derive(Debug, Default)]
struct Tables {
    entries: BTreeMap<KvKey, Entry>,
    /// Rate limit windows. Not reachable through get, set, delete or list.
    windows: HashMap<KvKey, Window>,
}

/// Mutex-guarded ordered map plus the rate limit windows. Every operation,
/// including the window hit, runs under the one lock, so read-modify-write
/// is atomic.
///
/// Expired entries are invisible to reads immediately and are physically
/// removed by [`MemoryKvStore::purge_expired`], which the sweeper task started
/// by [`MemoryKvStore::open`] calls periodically.
pub struct MemoryKvStore {
    tables: Mutex<Tables>,
    closed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryKvStore {
    /// Creates a store without a background sweeper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            closed: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        }
    }

    /// Opens a store and starts a sweeper purging expired entries every
    /// `sweep_interval`. Must be called inside a Tokio runtime.
    pub fn open(sweep_interval: Duration) -> Arc<Self> {
        let store = Arc::new(Self::new());
        let weak = Arc::downgrade(&store);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let removed = store.purge_expired(now_ms());
                if removed > 0 {
                    debug!(removed, "Purged expired KV entries");
                }
            }
        });

        if let Ok(mut slot) = store.sweeper.lock() {
            *slot = Some(handle);
        }
        info!(?sweep_interval, "KV store opened");
        store
    }

    /// Removes entries and windows that expired before `now_ms`, returning
    /// how many were dropped.
    pub fn purge_expired(&self, now_ms: i64) -> usize {
        let Ok(mut tables) = self.tables.lock() else {
            return 0;
        };
        let before = tables.entries.len() + tables.windows.len();
        tables.entries.retain(|_, entry| entry.is_live(now_ms));
        tables.windows.retain(|_, window| now_ms <= window.expires_at_ms);
        before - tables.entries.len() - tables.windows.len()
    }

    /// Number of stored entries, expired ones included until purged.
    /// Rate limit windows are not counted.
    pub fn len(&self) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.tables
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }

    async fn get(&self, key: &KvKey) -> Result<Option<Value>, StoreError> {
        let now = now_ms();
        let tables = self.tables()?;
        Ok(tables
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &KvKey,
        value: Value,
        expire_in: Option<Duration>,
    ) -> Result<(), StoreError> {
        let expires_at_ms = match expire_in {
            Some(ttl) if ttl.is_zero() => return Err(StoreError::InvalidTtl),
            Some(ttl) => {
                let ttl_ms = i64::try_from(ttl.as_millis()).map_err(|_| StoreError::InvalidTtl)?;
                Some(now_ms().saturating_add(ttl_ms))
            }
            None => None,
        };

        self.tables()?.entries.insert(
            key.clone(),
            Entry {
                value,
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &KvKey) -> Result<bool, StoreError> {
        let now = now_ms();
        let mut tables = self.tables()?;
        Ok(tables
            .entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn list(&self, prefix: &KvKey) -> Result<Vec<(KvKey, Value)>, StoreError> {
        let now = now_ms();
        let tables = self.tables()?;
        Ok(tables
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }

    async fn increment_window(
        &self,
        key: &KvKey,
        now_ms: i64,
        window_ms: i64,
        max: u64,
    ) -> Result<WindowHit, StoreError> {
        let mut tables = self.tables()?;

        let current = tables
            .windows
            .get(key)
            .map(|window| window.record)
            .filter(|record| !record.is_expired(now_ms, window_ms));

        let record = match current {
            None => RateLimitRecord::fresh(now_ms),
            Some(record) if record.count < max => RateLimitRecord {
                count: record.count.saturating_add(1),
                window_start_millis: now_ms,
            },
            // Rejected hits leave the window untouched
            Some(record) => {
                return Ok(WindowHit {
                    record,
                    admitted: false,
                });
            }
        };

        tables.windows.insert(
            key.clone(),
            Window {
                record,
                expires_at_ms: now_ms.saturating_add(window_ms),
            },
        );
        Ok(WindowHit {
            record,
            admitted: record.count <= max,
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        if let Ok(mut tables) = self.tables.lock() {
            tables.entries.clear();
            tables.windows.clear();
        }
        info!("KV store closed");
        Ok(())
    }
}
