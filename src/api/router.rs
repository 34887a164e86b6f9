//! Router assembly: dispatch table, documentation endpoints and the
//! admission-control layers.

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, warn};

use crate::app::{AssembledApi, Assembly, DocumentMeta, KvRateLimiter, SharedState, assemble};
use crate::domain::AppError;

use super::handlers::{
    ApiDocs, fallback_handler, metrics_handler, openapi_handler, ui_handler,
};
use super::middleware::{
    bearer_auth_middleware, cors_layer, error_normalizer, handle_panic, rate_limit_middleware,
    security_headers_middleware,
};

/// Assembles the loaded domains and builds the full router.
///
/// # Errors
///
/// Fails when two routes collide, a route shadows a documentation endpoint,
/// or `APP_URL` is not a valid CORS origin.
pub fn create_router(state: SharedState, assembly: &Assembly) -> Result<Router, AppError> {
    let meta = DocumentMeta::from_config(&state.config, state.metrics.is_some());
    let api = assemble(&meta, assembly.domains(), &state.config.base_url)?;
    router_from_api(state, api)
}

/// Builds the router around an already assembled API.
pub fn router_from_api(state: SharedState, api: AssembledApi) -> Result<Router, AppError> {
    let config = Arc::clone(&state.config);
    let AssembledApi {
        meta,
        document,
        ui_html,
        dispatch,
    } = api;

    info!(
        routes = dispatch.len(),
        base_url = %config.base_url,
        production = config.is_production(),
        "Mounting API"
    );
    if config.bearer_token.is_none() {
        warn!(
            fail_closed = config.auth_fail_closed,
            "No BEARER_TOKEN configured for domain routes"
        );
    }

    let mut domain_routes = if dispatch.is_empty() {
        Router::new()
    } else {
        dispatch.into_router().route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            bearer_auth_middleware,
        ))
    };

    let docs = Arc::new(ApiDocs { document, ui_html });
    let docs_routes: Router<SharedState> = Router::new()
        .route(&meta.doc_path, get(openapi_handler))
        .route(&meta.ui_path, get(ui_handler))
        .with_state(docs);
    domain_routes = domain_routes.merge(docs_routes);

    if let Some(metrics_path) = &meta.metrics_path {
        domain_routes = domain_routes.route(metrics_path, get(metrics_handler));
    }

    let mut router = domain_routes
        .fallback(fallback_handler)
        .layer(CatchPanicLayer::custom(handle_panic));

    if config.is_production() {
        let limiter = Arc::new(KvRateLimiter::new(
            Arc::clone(&state.store),
            config.rate_limit,
        ));
        router = router
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(cors_layer(&config.app_url)?);
    }

    Ok(router
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            error_normalizer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state))
}
