//! Route descriptors and their merged response contracts.
//!
//! A [`RouteBuilder`] accumulates one endpoint's schemas during registration;
//! [`RouteBuilder::build`] freezes it into a [`Route`] once the owning domain
//! is complete.

use std::collections::BTreeMap;
use std::fmt;

use axum::handler::Handler;
use axum::routing::{MethodFilter, MethodRouter, on};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{ErrorResponse, HttpMethod, ResponseContract, Tag, deep_merge};

use super::state::SharedState;

/// Response contracts every route documents unless it declares its own.
pub fn default_error_responses() -> BTreeMap<u16, ResponseContract> {
    let error = ErrorResponse::schema();
    BTreeMap::from([
        (
            401,
            ResponseContract::new("Unauthorized: authentication required", error.clone()),
        ),
        (
            403,
            ResponseContract::new("Forbidden: access denied", error.clone()),
        ),
        (
            429,
            ResponseContract::new("Too many requests: rate limited", error.clone()),
        ),
        (
            500,
            ResponseContract::new("Internal server error", error.clone()),
        ),
        (
            503,
            ResponseContract::new(
                "Service unavailable: one or more dependencies are down",
                error,
            ),
        ),
    ])
}

/// OpenAPI `responses` object for a set of contracts, keyed by status code.
pub fn responses_object(contracts: &BTreeMap<u16, ResponseContract>) -> Map<String, Value> {
    contracts
        .iter()
        .map(|(status, contract)| (status.to_string(), contract.to_openapi()))
        .collect()
}

/// Lays `declared` over `defaults`.
///
/// A declared status code replaces the default for that code as a whole;
/// defaults survive for every code the route does not declare.
pub fn merge_responses(
    defaults: &Map<String, Value>,
    declared: &Map<String, Value>,
) -> Map<String, Value> {
    let untouched: Map<String, Value> = defaults
        .iter()
        .filter(|(status, _)| !declared.contains_key(*status))
        .map(|(status, response)| (status.clone(), response.clone()))
        .collect();

    match deep_merge(&Value::Object(untouched), &Value::Object(declared.clone())) {
        Value::Object(merged) => merged,
        _ => Map::new(),
    }
}

/// Joins mount prefix, domain base path and route path.
///
/// Trailing slashes are trimmed; an empty result is `/`.
pub fn mount_path(base_url: &str, base_path: &str, path: &str) -> String {
    let joined = format!("{base_url}{base_path}{path}");
    let trimmed = joined.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// Request facets of a route schema. Absent facets carry no constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Derived view of a route: method, path, tag names, request facets and the
/// merged response map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSchema {
    pub method: HttpMethod,
    pub path: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSchema>,
    pub responses: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct RouteDecl {
    method: HttpMethod,
    path: String,
    tags: Vec<Tag>,
    params: Option<Value>,
    query: Option<Value>,
    body: Option<Value>,
    responses: BTreeMap<u16, ResponseContract>,
}

impl RouteDecl {
    fn schema_at(&self, path: String) -> RouteSchema {
        let request = if self.params.is_some() || self.query.is_some() || self.body.is_some() {
            Some(RequestSchema {
                params: self.params.clone(),
                query: self.query.clone(),
                body: self.body.clone(),
            })
        } else {
            None
        };

        RouteSchema {
            method: self.method,
            path,
            tags: self.tags.iter().map(|tag| tag.name.clone()).collect(),
            request,
            responses: merge_responses(
                &responses_object(&default_error_responses()),
                &responses_object(&self.responses),
            ),
        }
    }
}

/// Fluent accumulator for one endpoint. Every mutator returns `&mut Self`.
pub struct RouteBuilder {
    decl: RouteDecl,
    handler: MethodRouter<SharedState>,
}

impl RouteBuilder {
    pub fn new<H, T>(method: HttpMethod, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, SharedState>,
        T: 'static,
    {
        Self {
            decl: RouteDecl {
                method,
                path: path.into(),
                tags: Vec::new(),
                params: None,
                query: None,
                body: None,
                responses: BTreeMap::new(),
            },
            handler: on(method_filter(method), handler),
        }
    }

    /// Sets the path parameter schema (a JSON Schema object).
    pub fn params(&mut self, schema: Value) -> &mut Self {
        self.decl.params = Some(schema);
        self
    }

    /// Sets the query string schema (a JSON Schema object).
    pub fn query(&mut self, schema: Value) -> &mut Self {
        self.decl.query = Some(schema);
        self
    }

    /// Sets the JSON request body schema.
    pub fn body(&mut self, schema: Value) -> &mut Self {
        self.decl.body = Some(schema);
        self
    }

    /// Declares the response for `status` with a generic description.
    pub fn response(&mut self, status: u16, schema: Value) -> &mut Self {
        self.describe_response(status, format!("Response {status}"), schema)
    }

    pub fn describe_response(
        &mut self,
        status: u16,
        description: impl Into<String>,
        schema: Value,
    ) -> &mut Self {
        self.decl
            .responses
            .insert(status, ResponseContract::new(description, schema));
        self
    }

    pub fn tag(&mut self, tag: Tag) -> &mut Self {
        self.decl.tags.push(tag);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.decl.method
    }

    pub fn path(&self) -> &str {
        &self.decl.path
    }

    /// Current schema view. Recomputed on every call.
    pub fn schema(&self) -> RouteSchema {
        self.decl.schema_at(self.decl.path.clone())
    }

    /// Freezes the descriptor.
    pub fn build(self) -> Route {
        Route {
            decl: self.decl,
            handler: self.handler,
        }
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("decl", &self.decl)
            .finish_non_exhaustive()
    }
}

/// Read-only route produced once registration completes.
#[derive(Clone)]
pub struct Route {
    decl: RouteDecl,
    handler: MethodRouter<SharedState>,
}

impl Route {
    pub fn method(&self) -> HttpMethod {
        self.decl.method
    }

    pub fn path(&self) -> &str {
        &self.decl.path
    }

    pub fn tags(&self) -> &[Tag] {
        &self.decl.tags
    }

    pub fn schema(&self) -> RouteSchema {
        self.decl.schema_at(self.decl.path.clone())
    }

    /// Schema view with the path rewritten to where the route is mounted.
    pub fn schema_at(&self, mounted_path: impl Into<String>) -> RouteSchema {
        self.decl.schema_at(mounted_path.into())
    }

    pub fn handler(&self) -> MethodRouter<SharedState> {
        self.handler.clone()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("decl", &self.decl)
            .finish_non_exhaustive()
    }
}
