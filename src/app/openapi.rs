//! OpenAPI document assembly and the route dispatch table.
//!
//! [`build_document`] is a pure function of the assembled domains, so running
//! it twice over the same input yields byte-identical JSON. [`assemble`] also
//! collects every route handler under its exact method and mounted path.

use std::collections::{BTreeMap, HashMap};

use axum::Router;
use axum::routing::MethodRouter;
use serde_json::{Map, Value, json};

use crate::domain::{AssemblyError, HttpMethod, deep_merge};

use super::config::AppConfig;
use super::registry::Domain;
use super::route::{RouteSchema, mount_path};
use super::state::SharedState;

/// Crate version, reported in the document and the UI title.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level facts of the generated document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub app_name: String,
    pub version: String,
    pub doc_path: String,
    pub ui_path: String,
    /// Set when the metrics endpoint is mounted.
    pub metrics_path: Option<String>,
    /// Deep-merged over the generated document.
    pub overrides: Option<Value>,
}

impl DocumentMeta {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            version: VERSION.to_string(),
            doc_path: "/doc".to_string(),
            ui_path: "/ui".to_string(),
            metrics_path: None,
            overrides: None,
        }
    }

    pub fn from_config(config: &AppConfig, metrics_enabled: bool) -> Self {
        Self {
            app_name: config.app_name.clone(),
            version: VERSION.to_string(),
            doc_path: config.doc_path.clone(),
            ui_path: config.ui_path.clone(),
            metrics_path: metrics_enabled.then(|| config.metrics_path.clone()),
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn title(&self) -> String {
        format!("{} API Docs", self.app_name)
    }

    fn reserved_paths(&self) -> Vec<&str> {
        let mut paths = vec![self.doc_path.as_str(), self.ui_path.as_str()];
        if let Some(metrics_path) = &self.metrics_path {
            paths.push(metrics_path);
        }
        paths
    }
}

/// Builds the OpenAPI 3.0 description of every route in `domains`.
pub fn build_document(meta: &DocumentMeta, domains: &[Domain], base_url: &str) -> Value {
    let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for domain in domains {
        for route in domain.routes() {
            let full_path = mount_path(base_url, domain.base_path(), route.path());
            let schema = route.schema_at(full_path.clone());
            paths
                .entry(full_path)
                .or_default()
                .insert(route.method().as_str().to_string(), operation(&schema));
        }
    }

    let tags: Vec<Value> = domains
        .iter()
        .map(|domain| match domain.description() {
            Some(description) => json!({ "name": domain.name(), "description": description }),
            None => json!({ "name": domain.name() }),
        })
        .collect();

    let document = json!({
        "openapi": "3.0.0",
        "info": {
            "version": meta.version,
            "title": meta.title(),
        },
        "tags": tags,
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer" }
            }
        },
        "security": [{ "bearerAuth": [] }],
    });

    match &meta.overrides {
        Some(overrides) => deep_merge(&document, overrides),
        None => document,
    }
}

fn operation(schema: &RouteSchema) -> Value {
    let mut operation = Map::new();
    operation.insert("tags".to_string(), json!(schema.tags));

    if let Some(request) = &schema.request {
        let mut parameters = Vec::new();
        if let Some(params) = &request.params {
            parameters.extend(parameters_from(params, "path"));
        }
        if let Some(query) = &request.query {
            parameters.extend(parameters_from(query, "query"));
        }
        if !parameters.is_empty() {
            operation.insert("parameters".to_string(), Value::Array(parameters));
        }
        if let Some(body) = &request.body {
            operation.insert(
                "requestBody".to_string(),
                json!({
                    "required": true,
                    "content": { "application/json": { "schema": body } }
                }),
            );
        }
    }

    operation.insert(
        "responses".to_string(),
        Value::Object(schema.responses.clone()),
    );
    Value::Object(operation)
}

/// One parameter object per property of an object schema. Path parameters
/// are always required; query parameters only when listed in `required`.
fn parameters_from(schema: &Value, location: &str) -> Vec<Value> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            json!({
                "name": name,
                "in": location,
                "required": location == "path" || required.contains(&name.as_str()),
                "schema": property,
            })
        })
        .collect()
}

/// Route handler registered under its exact method and mounted path.
#[derive(Clone)]
pub struct DispatchEntry {
    pub schema: RouteSchema,
    pub handler: MethodRouter<SharedState>,
}

/// Every mounted route, keyed by exact method and full path.
#[derive(Clone, Default)]
pub struct DispatchTable {
    entries: BTreeMap<(HttpMethod, String), DispatchEntry>,
}

impl DispatchTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, method: HttpMethod, path: &str) -> bool {
        self.entries.contains_key(&(method, path.to_string()))
    }

    pub fn get(&self, method: HttpMethod, path: &str) -> Option<&DispatchEntry> {
        self.entries.get(&(method, path.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = (HttpMethod, &str)> {
        self.entries
            .keys()
            .map(|(method, path)| (*method, path.as_str()))
    }

    /// Flat router with one method router per path.
    pub fn into_router(self) -> Router<SharedState> {
        let mut by_path: BTreeMap<String, MethodRouter<SharedState>> = BTreeMap::new();
        for ((_, path), entry) in self.entries {
            let handler = match by_path.remove(&path) {
                Some(existing) => existing.merge(entry.handler),
                None => entry.handler,
            };
            by_path.insert(path, handler);
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, handler)| {
                router.route(&path, handler)
            })
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// Document, documentation page and dispatch table of one assembly.
#[derive(Debug, Clone)]
pub struct AssembledApi {
    pub meta: DocumentMeta,
    pub document: Value,
    pub ui_html: String,
    pub dispatch: DispatchTable,
}

/// Builds the document and registers every route in the dispatch table.
///
/// # Errors
///
/// Returns [`AssemblyError::DuplicateRoute`] when two routes share a method
/// and mounted path, or a route shadows the doc, UI or metrics endpoint.
/// Returns [`AssemblyError::InvalidPath`] when two mounted paths differ only
/// in their parameter names.
pub fn assemble(
    meta: &DocumentMeta,
    domains: &[Domain],
    base_url: &str,
) -> Result<AssembledApi, AssemblyError> {
    let reserved = meta.reserved_paths();
    let mut shapes: HashMap<String, String> = HashMap::new();
    let mut dispatch = DispatchTable::default();

    for domain in domains {
        for route in domain.routes() {
            let full_path = mount_path(base_url, domain.base_path(), route.path());
            let duplicate = || AssemblyError::DuplicateRoute {
                method: route.method().to_string(),
                path: full_path.clone(),
            };

            if reserved.contains(&full_path.as_str()) {
                return Err(duplicate());
            }

            let shape = path_shape(&full_path);
            match shapes.get(&shape) {
                Some(existing) if existing != &full_path => {
                    return Err(AssemblyError::InvalidPath {
                        path: full_path.clone(),
                        message: format!("conflicts with '{existing}'"),
                    });
                }
                Some(_) => {}
                None => {
                    shapes.insert(shape, full_path.clone());
                }
            }

            let key = (route.method(), full_path.clone());
            if dispatch.entries.contains_key(&key) {
                return Err(duplicate());
            }
            dispatch.entries.insert(
                key,
                DispatchEntry {
                    schema: route.schema_at(full_path.clone()),
                    handler: route.handler(),
                },
            );
        }
    }

    Ok(AssembledApi {
        meta: meta.clone(),
        document: build_document(meta, domains, base_url),
        ui_html: render_ui_html(&meta.app_name, &meta.version, &meta.doc_path),
        dispatch,
    })
}

/// Path with every `{param}` segment blanked, so `/a/{id}` and `/a/{key}`
/// compare equal.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Dark-themed Swagger UI page reading the document at `doc_path`.
pub fn render_ui_html(app_name: &str, version: &str, doc_path: &str) -> String {
    let name = escape_html(app_name);
    let version = escape_html(version);
    let doc_url = serde_json::to_string(doc_path).unwrap_or_else(|_| "\"/doc\"".to_string());

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <meta name="description" content="{name} API Doc" />
    <title>{name} [{version}] API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
    <style>
      body {{ background: #1c1c21; margin: 0; }}
      .swagger-ui, .swagger-ui .info .title, .swagger-ui .opblock-tag {{ color: #bfc3ca; }}
      .swagger-ui .scheme-container {{ background: #1c1c21 !important; box-shadow: none; }}
      .swagger-ui .opblock .opblock-summary-description,
      .swagger-ui .parameter__name,
      .swagger-ui .response-col_status,
      .swagger-ui table thead tr th {{ color: #bfc3ca !important; }}
      .swagger-ui .opblock .opblock-section-header {{ background: #26262c; }}
      .swagger-ui input, .swagger-ui select, .swagger-ui textarea {{
        background: #26262c; color: whitesmoke;
      }}
    </style>
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
    <script>
      window.onload = () => {{
        window.ui = SwaggerUIBundle({{ url: {doc_url}, dom_id: '#swagger-ui' }});
      }};
    </script>
  </body>
</html>
"#
    )
}
