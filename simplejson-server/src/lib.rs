//! SimpleJSON Adapter Library
//!
//! This library serves Grafana's Simple JSON datasource protocol on top of
//! application supplied datasources, including request dispatch, basic auth,
//! and the HTTP handlers.

pub mod auth;
pub mod config;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod handlers;

use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::{any, post},
    Router,
};
use simplejson_core::Datasources;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

// Re-export commonly used types
pub use config::{BasicAuthConfig, ServerConfig};
pub use dispatcher::Dispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(sources: Datasources, config: ServerConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(sources)),
            config: Arc::new(config),
        }
    }
}

/// Build the protocol router.
///
/// Every response, errors included, carries permissive CORS headers.
pub fn build_router(state: AppState) -> Router {
    use handlers::*;

    let protocol = Router::new()
        .route("/query", post(query_handler))
        .route(
            "/annotations",
            post(annotations_handler).options(annotations_options_handler),
        )
        .route("/search", post(search_handler))
        .route("/tag-keys", post(tag_keys_handler))
        .route("/tag-values", post(tag_values_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/", any(root_handler))
        .merge(protocol)
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static("accept, content-type"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static("POST"),
                )),
        )
        .with_state(state)
}
