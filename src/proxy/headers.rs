//! Header sanitization for AI provider proxying
//!
//! Inbound `Host` and `Authorization`/API-key headers are provider-controlled
//! secrets, never passthrough data. Each provider gets the exact header set
//! its API expects; nothing else leaks upstream.
//!
//! All functions here are pure and deterministic. `HeaderMap` normalizes
//! names to lowercase, so matching is case-insensitive for free. Duplicate
//! inbound names collapse to the last value (`HeaderMap::insert`).

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Anthropic protocol version sent with every request
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Key-header auth header name
const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
/// Anthropic version header name
const ANTHROPIC_VERSION_HEADER: HeaderName = HeaderName::from_static("anthropic-version");
/// OpenAI organization header name
const OPENAI_ORGANIZATION: HeaderName = HeaderName::from_static("openai-organization");

/// Inbound headers allowed through to key-auth providers
const KEY_AUTH_ALLOWED: &[HeaderName] = &[
    header::ACCEPT,
    header::CONNECTION,
    header::USER_AGENT,
    header::CONTENT_LENGTH,
];

/// Hop-by-hop headers stripped from upstream responses
const HOP_BY_HOP_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the outbound header set for a key-auth provider (Anthropic)
///
/// Strict allow-list: only `accept`, `connection`, `user-agent` and
/// `content-length` survive from the inbound set, then the API key, a JSON
/// content type, the protocol version and a wildcard accept are forced.
pub fn sanitize_key_auth(inbound: &HeaderMap, api_key: &HeaderValue) -> HeaderMap {
    let mut outbound = HeaderMap::new();

    for name in KEY_AUTH_ALLOWED {
        if let Some(value) = inbound.get(name) {
            outbound.insert(name.clone(), value.clone());
        }
    }

    outbound.insert(X_API_KEY, api_key.clone());
    outbound.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    outbound.insert(
        ANTHROPIC_VERSION_HEADER,
        HeaderValue::from_static(ANTHROPIC_VERSION),
    );
    outbound.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

    outbound
}

/// Build the outbound header set for a bearer-auth provider (OpenAI)
///
/// Deny-list: the full inbound set minus `host` and `authorization`, then
/// the bearer token and (when configured) the organization header are forced.
pub fn sanitize_bearer_auth(
    inbound: &HeaderMap,
    bearer: &HeaderValue,
    organization: Option<&HeaderValue>,
) -> HeaderMap {
    let mut outbound = HeaderMap::new();

    for (name, value) in inbound {
        if name == &header::HOST || name == &header::AUTHORIZATION {
            continue;
        }
        outbound.insert(name.clone(), value.clone());
    }

    outbound.insert(header::AUTHORIZATION, bearer.clone());
    if let Some(org) = organization {
        outbound.insert(OPENAI_ORGANIZATION, org.clone());
    }

    outbound
}

/// Check if a header is a hop-by-hop header that must not be forwarded
pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}
