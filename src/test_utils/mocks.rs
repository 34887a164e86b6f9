//! Mock implementations for testing.
//!
//! A configurable KV store plus fixture domain and route modules that can be
//! made to fail at each assembly step.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::{DomainBuilder, DomainModule, RouteModule};
use crate::domain::{AssemblyError, HttpMethod, KvKey, KvStore, StoreError, WindowHit};
use crate::infra::MemoryKvStore;

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// If true, operations will fail.
    pub should_fail: bool,
    /// Custom error message for failures.
    pub error_message: Option<String>,
}

impl MockConfig {
    /// Creates a config that always succeeds.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Creates a config that always fails.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// KV store that delegates to [`MemoryKvStore`] unless configured to fail.
///
/// # Example
///
/// ```
/// use sloth_rest::test_utils::{MockKvStore, mocks::MockConfig};
///
/// let healthy = MockKvStore::new();
/// let broken = MockKvStore::with_config(MockConfig::failure("disk on fire"));
/// assert_eq!(broken.call_count(), 0);
/// ```
pub struct MockKvStore {
    inner: MemoryKvStore,
    config: MockConfig,
    call_count: AtomicU64,
}

impl MockKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            inner: MemoryKvStore::new(),
            config,
            call_count: AtomicU64::new(0),
        }
    }

    /// Number of store operations attempted.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    fn simulate(&self) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.config.should_fail {
            let message = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "mock failure".to_string());
            return Err(StoreError::Poisoned(message));
        }
        Ok(())
    }
}

impl Default for MockKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MockKvStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.simulate()?;
        self.inner.health_check().await
    }

    async fn get(&self, key: &KvKey) -> Result<Option<Value>, StoreError> {
        self.simulate()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &KvKey,
        value: Value,
        expire_in: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.simulate()?;
        self.inner.set(key, value, expire_in).await
    }

    async fn delete(&self, key: &KvKey) -> Result<bool, StoreError> {
        self.simulate()?;
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &KvKey) -> Result<Vec<(KvKey, Value)>, StoreError> {
        self.simulate()?;
        self.inner.list(prefix).await
    }

    async fn increment_window(
        &self,
        key: &KvKey,
        now_ms: i64,
        window_ms: i64,
        max: u64,
    ) -> Result<WindowHit, StoreError> {
        self.simulate()?;
        self.inner.increment_window(key, now_ms, window_ms, max).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

/// Domain module with a fixed name, base path and route modules.
///
/// Route modules are handed out once; a second `routes` call returns none.
pub struct FixtureDomainModule {
    name: String,
    base_path: String,
    routes: Mutex<Vec<Box<dyn RouteModule>>>,
}

impl FixtureDomainModule {
    pub fn new(
        name: impl Into<String>,
        base_path: impl Into<String>,
        routes: Vec<Box<dyn RouteModule>>,
    ) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            routes: Mutex::new(routes),
        }
    }
}

#[async_trait]
impl DomainModule for FixtureDomainModule {
    async fn create(&self) -> Result<DomainBuilder, AssemblyError> {
        Ok(DomainBuilder::new(&self.name, &self.base_path))
    }

    fn routes(&self) -> Vec<Box<dyn RouteModule>> {
        self.routes
            .lock()
            .map(|mut routes| std::mem::take(&mut *routes))
            .unwrap_or_default()
    }
}

/// Domain module whose factory always fails.
pub struct FailingDomainModule {
    name: String,
}

impl FailingDomainModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl DomainModule for FailingDomainModule {
    async fn create(&self) -> Result<DomainBuilder, AssemblyError> {
        Err(AssemblyError::DomainFactory {
            module: self.name.clone(),
            message: "simulated factory failure".to_string(),
        })
    }

    fn routes(&self) -> Vec<Box<dyn RouteModule>> {
        Vec::new()
    }
}

async fn fixture_handler() -> &'static str {
    "fixture"
}

/// Domain module whose factory already registers a route.
pub struct NonEmptyDomainModule;

#[async_trait]
impl DomainModule for NonEmptyDomainModule {
    async fn create(&self) -> Result<DomainBuilder, AssemblyError> {
        let mut domain = DomainBuilder::new("Eager", "/eager");
        domain.add_route(HttpMethod::Get, "/", fixture_handler);
        Ok(domain)
    }

    fn routes(&self) -> Vec<Box<dyn RouteModule>> {
        Vec::new()
    }
}

/// Route module whose registration always fails.
pub struct FailingRouteModule;

#[async_trait]
impl RouteModule for FailingRouteModule {
    async fn register(&self, domain: &mut DomainBuilder) -> Result<(), AssemblyError> {
        Err(AssemblyError::RouteRegistration {
            domain: domain.name().to_string(),
            message: "simulated registration failure".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_delegates_when_healthy() {
        let store = MockKvStore::new();
        let key = KvKey::from_dotted("a.b");

        store.set(&key, Value::Bool(true), None).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), Some(Value::Bool(true)));
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_store_failure_mode() {
        let store = MockKvStore::with_config(MockConfig::failure("down"));

        let result = store.health_check().await;

        assert_eq!(result, Err(StoreError::Poisoned("down".to_string())));
    }

    #[tokio::test]
    async fn test_fixture_routes_are_handed_out_once() {
        fn noop_route(_: &mut DomainBuilder) {}
        let module = FixtureDomainModule::new("A", "", vec![Box::new(noop_route)]);

        assert_eq!(module.routes().len(), 1);
        assert!(module.routes().is_empty());
    }
}
