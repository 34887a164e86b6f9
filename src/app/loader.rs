//! Startup assembly of domains from an explicit module registry.
//!
//! The loader walks a [`ModuleRegistry`] instead of the filesystem. Every
//! [`DomainModule`] contributes one empty domain plus the route modules that
//! register into it:
//!
//! ```text
//! Idle -> DiscoveringDomains -> DiscoveringRoutes -> Assembled
//!                 \                    \
//!                  +--------------------+--> Failed
//! ```
//!
//! Domain factories run concurrently and the first failure aborts assembly.
//! Route registration fans out per domain; inside one domain route modules
//! run in declaration order so the documentation order is stable.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{error, info};

use crate::domain::AssemblyError;

use super::registry::{Domain, DomainBuilder};

/// Entry module of one domain.
#[async_trait]
pub trait DomainModule: Send + Sync {
    /// Creates the domain with no routes registered yet.
    async fn create(&self) -> Result<DomainBuilder, AssemblyError>;

    /// Route modules of this domain, in documentation order.
    fn routes(&self) -> Vec<Box<dyn RouteModule>>;
}

/// Self-registering route module.
#[async_trait]
pub trait RouteModule: Send + Sync {
    async fn register(&self, domain: &mut DomainBuilder) -> Result<(), AssemblyError>;
}

/// Plain `fn(&mut DomainBuilder)` route modules.
#[async_trait]
impl<F> RouteModule for F
where
    F: Fn(&mut DomainBuilder) + Send + Sync,
{
    async fn register(&self, domain: &mut DomainBuilder) -> Result<(), AssemblyError> {
        self(domain);
        Ok(())
    }
}

/// Statically enumerated domain modules.
#[derive(Default)]
pub struct ModuleRegistry {
    domains: Vec<Box<dyn DomainModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, module: impl DomainModule + 'static) -> Self {
        self.domains.push(Box::new(module));
        self
    }

    pub fn domains(&self) -> &[Box<dyn DomainModule>] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("domains", &self.domains.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    DiscoveringDomains,
    DiscoveringRoutes,
    Assembled,
    Failed,
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderState::Idle => "idle",
            LoaderState::DiscoveringDomains => "discovering_domains",
            LoaderState::DiscoveringRoutes => "discovering_routes",
            LoaderState::Assembled => "assembled",
            LoaderState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Frozen result of a successful load.
#[derive(Debug, Clone)]
pub struct Assembly {
    domains: Vec<Domain>,
}

impl Assembly {
    pub fn new(domains: Vec<Domain>) -> Self {
        Self { domains }
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn route_count(&self) -> usize {
        self.domains.iter().map(|d| d.routes().len()).sum()
    }
}

/// Runs a [`ModuleRegistry`] through the assembly state machine once.
#[derive(Debug)]
pub struct Loader {
    registry: ModuleRegistry,
    state: LoaderState,
}

impl Loader {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            state: LoaderState::Idle,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// Discovers every domain, registers its routes and freezes the result.
    ///
    /// # Errors
    ///
    /// Any factory or registration failure moves the loader to
    /// [`LoaderState::Failed`]. Calling `load` again after it ran returns
    /// [`AssemblyError::AlreadyAssembled`].
    pub async fn load(&mut self) -> Result<Assembly, AssemblyError> {
        if self.state != LoaderState::Idle {
            return Err(AssemblyError::AlreadyAssembled);
        }

        match self.run().await {
            Ok(assembly) => {
                self.transition(LoaderState::Assembled);
                info!(
                    domains = assembly.domains().len(),
                    routes = assembly.route_count(),
                    "API assembly complete"
                );
                Ok(assembly)
            }
            Err(e) => {
                self.transition(LoaderState::Failed);
                error!(error = %e, "API assembly failed");
                Err(e)
            }
        }
    }

    async fn run(&mut self) -> Result<Assembly, AssemblyError> {
        self.transition(LoaderState::DiscoveringDomains);
        let builders = try_join_all(self.registry.domains().iter().map(|m| m.create())).await?;

        let mut seen = HashSet::new();
        for builder in &builders {
            if !builder.routes().is_empty() {
                return Err(AssemblyError::DomainNotEmpty(builder.name().to_string()));
            }
            if !seen.insert(builder.name().to_string()) {
                return Err(AssemblyError::DuplicateDomain(builder.name().to_string()));
            }
        }

        self.transition(LoaderState::DiscoveringRoutes);
        let domains = try_join_all(
            builders
                .into_iter()
                .zip(self.registry.domains())
                .map(|(builder, module)| register_routes(builder, module.as_ref())),
        )
        .await?;

        Ok(Assembly::new(domains))
    }

    fn transition(&mut self, next: LoaderState) {
        info!(from = %self.state, to = %next, "Loader state change");
        self.state = next;
    }
}

async fn register_routes(
    mut builder: DomainBuilder,
    module: &dyn DomainModule,
) -> Result<Domain, AssemblyError> {
    let domain_name = builder.name().to_string();

    for route_module in module.routes() {
        route_module
            .register(&mut builder)
            .await
            .map_err(|e| match e {
                e @ AssemblyError::RouteRegistration { .. } => e,
                other => AssemblyError::RouteRegistration {
                    domain: domain_name.clone(),
                    message: other.to_string(),
                },
            })?;
    }

    let domain = builder.build()?;
    for route in domain.routes() {
        info!(
            "[{}] {} {}{}",
            domain.name(),
            route.method(),
            domain.base_path(),
            route.path()
        );
    }
    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;
    use crate::test_utils::{
        FailingDomainModule, FailingRouteModule, FixtureDomainModule, NonEmptyDomainModule,
    };

    async fn noop() {}

    fn ping(domain: &mut DomainBuilder) {
        domain.add_route(HttpMethod::Get, "/ping", noop);
    }

    fn pong(domain: &mut DomainBuilder) {
        domain.add_route(HttpMethod::Post, "/pong", noop);
    }

    #[tokio::test]
    async fn test_load_assembles_all_domains() {
        let registry = ModuleRegistry::new()
            .with_domain(FixtureDomainModule::new("Alpha", "/alpha", vec![
                Box::new(ping),
                Box::new(pong),
            ]))
            .with_domain(FixtureDomainModule::new("Beta", "/beta", vec![Box::new(ping)]));
        let mut loader = Loader::new(registry);
        assert_eq!(loader.state(), LoaderState::Idle);

        let assembly = loader.load().await.unwrap();

        assert_eq!(loader.state(), LoaderState::Assembled);
        assert_eq!(assembly.domains().len(), 2);
        assert_eq!(assembly.route_count(), 3);
        let alpha: Vec<&str> = assembly.domains()[0].routes().iter().map(|r| r.path()).collect();
        assert_eq!(alpha, vec!["/ping", "/pong"]);
    }

    #[tokio::test]
    async fn test_domain_factory_failure_aborts() {
        let registry = ModuleRegistry::new()
            .with_domain(FixtureDomainModule::new("Alpha", "", vec![Box::new(ping)]))
            .with_domain(FailingDomainModule::new("Broken"));
        let mut loader = Loader::new(registry);

        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, AssemblyError::DomainFactory { module, .. } if module == "Broken"));
        assert_eq!(loader.state(), LoaderState::Failed);
    }

    #[tokio::test]
    async fn test_non_empty_domain_is_rejected() {
        let mut loader = Loader::new(ModuleRegistry::new().with_domain(NonEmptyDomainModule));

        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, AssemblyError::DomainNotEmpty(_)));
    }

    #[tokio::test]
    async fn test_duplicate_domain_names_are_rejected() {
        let registry = ModuleRegistry::new()
            .with_domain(FixtureDomainModule::new("Same", "/a", vec![]))
            .with_domain(FixtureDomainModule::new("Same", "/b", vec![]));

        let err = Loader::new(registry).load().await.unwrap_err();

        assert_eq!(err, AssemblyError::DuplicateDomain("Same".to_string()));
    }

    #[tokio::test]
    async fn test_route_module_failure_names_domain() {
        let registry = ModuleRegistry::new().with_domain(FixtureDomainModule::new(
            "Alpha",
            "",
            vec![Box::new(ping), Box::new(FailingRouteModule)],
        ));

        let err = Loader::new(registry).load().await.unwrap_err();

        assert!(
            matches!(err, AssemblyError::RouteRegistration { domain, .. } if domain == "Alpha")
        );
    }

    #[tokio::test]
    async fn test_invalid_route_path_fails_assembly() {
        fn relative(domain: &mut DomainBuilder) {
            domain.add_route(HttpMethod::Get, "relative", noop);
        }
        let registry = ModuleRegistry::new()
            .with_domain(FixtureDomainModule::new("Alpha", "", vec![Box::new(relative)]));

        let err = Loader::new(registry).load().await.unwrap_err();

        assert!(matches!(err, AssemblyError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn test_second_load_is_rejected() {
        let mut loader = Loader::new(ModuleRegistry::new());
        loader.load().await.unwrap();

        let err = loader.load().await.unwrap_err();

        assert_eq!(err, AssemblyError::AlreadyAssembled);
        assert_eq!(loader.state(), LoaderState::Assembled);
    }
}
