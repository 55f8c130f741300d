//! Provider catch-all proxy handlers
//!
//! Thin axum handlers that hand the inbound method, path, raw query, headers
//! and body stream to the per-provider forwarding engine. All header
//! rewriting, pooling and error classification lives in the engine.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    http::{header::HeaderMap, Method},
    response::Response,
};

use crate::{error::ProxyError, AppState};

/// Forward any request under `/anthropic/*` to the Anthropic upstream
pub async fn anthropic_proxy(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    request: Request,
) -> Result<Response, ProxyError> {
    state
        .anthropic
        .forward(method, uri.path(), uri.query(), &headers, request.into_body())
        .await
}

/// Forward any request under `/openai/*` to the OpenAI upstream
pub async fn openai_proxy(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    request: Request,
) -> Result<Response, ProxyError> {
    state
        .openai
        .forward(method, uri.path(), uri.query(), &headers, request.into_body())
        .await
}
