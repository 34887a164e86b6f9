//! Domains: named groups of routes sharing a documentation tag.

use axum::handler::Handler;

use crate::domain::{AssemblyError, HttpMethod, Tag};

use super::route::{Route, RouteBuilder};
use super::state::SharedState;

/// Domain under construction. Route modules register into it.
#[derive(Debug)]
pub struct DomainBuilder {
    name: String,
    base_path: String,
    description: Option<String>,
    routes: Vec<RouteBuilder>,
}

impl DomainBuilder {
    /// `base_path` is either empty or starts with `/`.
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            description: None,
            routes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn routes(&self) -> &[RouteBuilder] {
        &self.routes
    }

    /// Tag carried by every route of this domain.
    pub fn tag(&self) -> Tag {
        let tag = Tag::new(&self.name);
        match &self.description {
            Some(description) => tag.with_description(description),
            None => tag,
        }
    }

    /// Appends a route tagged with this domain and returns it for chaining.
    pub fn add_route<H, T>(
        &mut self,
        method: HttpMethod,
        path: impl Into<String>,
        handler: H,
    ) -> &mut RouteBuilder
    where
        H: Handler<T, SharedState>,
        T: 'static,
    {
        let mut route = RouteBuilder::new(method, path, handler);
        route.tag(self.tag());
        self.routes.push(route);
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    /// Freezes the domain, validating every path.
    pub fn build(self) -> Result<Domain, AssemblyError> {
        if !self.base_path.is_empty()
            && (!self.base_path.starts_with('/') || self.base_path.ends_with('/'))
        {
            return Err(AssemblyError::InvalidPath {
                path: self.base_path,
                message: "domain base path must be empty or start with '/' without a trailing '/'"
                    .to_string(),
            });
        }

        if let Some(route) = self.routes.iter().find(|r| !r.path().starts_with('/')) {
            return Err(AssemblyError::InvalidPath {
                path: route.path().to_string(),
                message: "route path must start with '/'".to_string(),
            });
        }

        Ok(Domain {
            name: self.name,
            base_path: self.base_path,
            description: self.description,
            routes: self.routes.into_iter().map(RouteBuilder::build).collect(),
        })
    }
}

/// Assembled domain. Immutable.
#[derive(Debug, Clone)]
pub struct Domain {
    name: String,
    base_path: String,
    description: Option<String>,
    routes: Vec<Route>,
}

impl Domain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn tag(&self) -> Tag {
        let tag = Tag::new(&self.name);
        match &self.description {
            Some(description) => tag.with_description(description),
            None => tag,
        }
    }
}
