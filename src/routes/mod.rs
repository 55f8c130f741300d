//! HTTP routes for Relay
//!
//! This module defines all HTTP endpoints exposed by the proxy.

pub mod health;
pub mod providers;

use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/anthropic/*path", any(providers::anthropic_proxy))
        .route("/openai/*path", any(providers::openai_proxy))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
