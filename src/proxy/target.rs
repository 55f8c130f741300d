//! Upstream target description
//!
//! One immutable [`UpstreamTarget`] per provider, built once at startup from
//! configuration. Validation failures here are fatal at startup, never
//! surfaced per-request.

use anyhow::{Context, Result};
use axum::http::header::{HeaderMap, HeaderValue};
use reqwest::Url;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::proxy::headers;

/// Authentication scheme a provider expects
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// Key-header auth with a strict allow-list header policy (Anthropic)
    ApiKey { key: HeaderValue },
    /// Bearer-token auth with a deny-list header policy (OpenAI)
    Bearer {
        token: HeaderValue,
        organization: Option<HeaderValue>,
    },
}

/// Immutable description of one upstream provider API
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    /// Provider name for logging
    pub name: &'static str,
    /// Path prefix stripped before forwarding, e.g. `anthropic`
    pub route_prefix: &'static str,
    /// Validated base URL, no trailing slash
    pub base_url: String,
    /// How requests to this provider authenticate
    pub auth: AuthScheme,
    /// Per-request timeout
    pub timeout: Duration,
}

impl UpstreamTarget {
    /// Build a key-auth target (Anthropic)
    pub fn key_auth(name: &'static str, prefix: &'static str, cfg: &UpstreamConfig) -> Result<Self> {
        let key = HeaderValue::from_str(&cfg.api_key)
            .with_context(|| format!("{} API key is not a valid header value", name))?;
        Self::build(name, prefix, cfg, AuthScheme::ApiKey { key })
    }

    /// Build a bearer-auth target (OpenAI)
    pub fn bearer_auth(
        name: &'static str,
        prefix: &'static str,
        cfg: &UpstreamConfig,
    ) -> Result<Self> {
        let token = HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))
            .with_context(|| format!("{} API key is not a valid header value", name))?;
        let organization = cfg
            .organization
            .as_deref()
            .map(|org| {
                HeaderValue::from_str(org)
                    .with_context(|| format!("{} organization is not a valid header value", name))
            })
            .transpose()?;
        Self::build(name, prefix, cfg, AuthScheme::Bearer { token, organization })
    }

    fn build(
        name: &'static str,
        prefix: &'static str,
        cfg: &UpstreamConfig,
        auth: AuthScheme,
    ) -> Result<Self> {
        let url = Url::parse(&cfg.base_url)
            .with_context(|| format!("{} base URL is malformed: {}", name, cfg.base_url))?;
        if !url.has_host() {
            anyhow::bail!("{} base URL has no host: {}", name, cfg.base_url);
        }

        Ok(Self {
            name,
            route_prefix: prefix,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth,
            timeout: Duration::from_secs(crate::config::clamp_timeout(cfg.timeout_secs)),
        })
    }

    /// Produce the exact header set sent upstream for one request
    pub fn sanitize(&self, inbound: &HeaderMap) -> HeaderMap {
        match &self.auth {
            AuthScheme::ApiKey { key } => headers::sanitize_key_auth(inbound, key),
            AuthScheme::Bearer { token, organization } => {
                headers::sanitize_bearer_auth(inbound, token, organization.as_ref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream_config(base_url: &str) -> UpstreamConfig {
        UpstreamConfig {
            base_url: base_url.to_string(),
            api_key: "sk-test".to_string(),
            organization: None,
            timeout_secs: 60,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let target =
            UpstreamTarget::key_auth("anthropic", "anthropic", &upstream_config("https://api.anthropic.com/"))
                .unwrap();
        assert_eq!(target.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_malformed_base_url_is_fatal() {
        assert!(
            UpstreamTarget::key_auth("anthropic", "anthropic", &upstream_config("not a url"))
                .is_err()
        );
    }

    #[test]
    fn test_timeout_clamped_at_construction() {
        let mut cfg = upstream_config("https://api.openai.com/v1");
        cfg.timeout_secs = 600;
        let target = UpstreamTarget::bearer_auth("openai", "openai", &cfg).unwrap();
        assert_eq!(target.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_sanitize_dispatches_on_scheme() {
        let inbound = HeaderMap::new();

        let key_target =
            UpstreamTarget::key_auth("anthropic", "anthropic", &upstream_config("https://api.anthropic.com"))
                .unwrap();
        assert_eq!(key_target.sanitize(&inbound).get("x-api-key").unwrap(), "sk-test");

        let mut cfg = upstream_config("https://api.openai.com/v1");
        cfg.organization = Some("org-1".to_string());
        let bearer_target = UpstreamTarget::bearer_auth("openai", "openai", &cfg).unwrap();
        let outbound = bearer_target.sanitize(&inbound);
        assert_eq!(outbound.get("authorization").unwrap(), "Bearer sk-test");
        assert_eq!(outbound.get("openai-organization").unwrap(), "org-1");
    }
}
