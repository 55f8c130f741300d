//! Request forwarding engine
//!
//! Takes an inbound method/path/query/headers/body, rewrites it for one
//! upstream provider and streams the upstream response back without
//! materializing either body. Transport failures are classified and the
//! counting ones are reported to the pool manager.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::HeaderMap, Method, Response, StatusCode};
use http_body_util::BodyExt;
use reqwest::Url;
use tracing::{debug, error, info, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::headers::is_hop_by_hop_header;
use crate::proxy::pool::ClientManager;
use crate::proxy::target::UpstreamTarget;

/// Forwards inbound requests to one upstream provider
pub struct ForwardEngine {
    target: UpstreamTarget,
    manager: Arc<ClientManager>,
    verbose_logging: bool,
}

impl ForwardEngine {
    /// Create an engine bound to one upstream target and its pool manager
    pub fn new(target: UpstreamTarget, manager: Arc<ClientManager>, verbose_logging: bool) -> Self {
        Self {
            target,
            manager,
            verbose_logging,
        }
    }

    /// The pool manager this engine reports failures to
    pub fn manager(&self) -> &Arc<ClientManager> {
        &self.manager
    }

    /// Forward one request upstream and stream the response back
    ///
    /// Upstream application errors (non-2xx/3xx with a response) pass through
    /// verbatim; only transport failures with no response at all surface as
    /// [`ProxyError`].
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        raw_query: Option<&str>,
        inbound_headers: &HeaderMap,
        body: Body,
    ) -> ProxyResult<Response<Body>> {
        let api_path = strip_provider_prefix(path, self.target.route_prefix);
        let url = self.build_url(api_path, raw_query)?;
        let outbound_headers = self.target.sanitize(inbound_headers);
        let client = self.manager.acquire()?;

        info!(
            provider = %self.target.name,
            method = %method,
            url = %url,
            "Forwarding request to upstream"
        );

        let mut request = client
            .request(method.clone(), url.clone())
            .headers(outbound_headers);

        // GET/HEAD carry no body; everything else streams through unless
        // verbose logging buffers it first
        if method != Method::GET && method != Method::HEAD {
            request = if self.verbose_logging {
                let bytes = body
                    .collect()
                    .await
                    .map_err(|err| {
                        error!(provider = %self.target.name, error = %err, "Failed to read inbound request body");
                        ProxyError::Request
                    })?
                    .to_bytes();
                debug!(
                    provider = %self.target.name,
                    body = %String::from_utf8_lossy(&bytes),
                    "Request body"
                );
                request.body(bytes)
            } else {
                request.body(reqwest::Body::wrap_stream(body.into_data_stream()))
            };
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let classified = ProxyError::from_transport(&err);
                error!(
                    provider = %self.target.name,
                    url = %url,
                    error = %err,
                    classified = classified.code(),
                    "Upstream request failed"
                );
                if classified.counts_as_pool_failure() {
                    self.manager.report_failure();
                }
                return Err(classified);
            }
        };

        let status = response.status();
        if status.as_u16() > 399 {
            warn!(
                provider = %self.target.name,
                status = %status,
                "Non-success status from upstream, passing through"
            );
        }

        self.stream_response(response)
    }

    /// Build the outbound URL; the raw query string is attached unmodified so
    /// upstream-specific encodings survive
    fn build_url(&self, api_path: &str, raw_query: Option<&str>) -> ProxyResult<Url> {
        let path = api_path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{}", self.target.base_url, path)).map_err(|err| {
            error!(provider = %self.target.name, path = %path, error = %err, "Invalid upstream URL");
            ProxyError::InvalidUrl
        })?;
        url.set_query(raw_query);
        Ok(url)
    }

    /// Convert the upstream response into a streamed axum response
    ///
    /// The body is a lazy chunk stream; dropping it on any exit path (full
    /// drain, caller abort, error) releases the upstream connection.
    fn stream_response(&self, response: reqwest::Response) -> ProxyResult<Response<Body>> {
        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

        let mut builder = Response::builder().status(status);
        for (name, value) in response.headers() {
            if !is_hop_by_hop_header(name) {
                builder = builder.header(name.clone(), value.clone());
            }
        }

        builder
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|err| {
                error!(provider = %self.target.name, error = %err, "Failed to build proxied response");
                ProxyError::Unexpected
            })
    }
}

/// Strip a provider prefix segment from the path if present
///
/// Pure string operation: routing already happened, this only removes the
/// segment so the upstream sees its own path space.
fn strip_provider_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let path = path.trim_start_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => &rest[1..],
        Some("") => "",
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_provider_prefix() {
        assert_eq!(strip_provider_prefix("anthropic/v1/messages", "anthropic"), "v1/messages");
        assert_eq!(strip_provider_prefix("/anthropic/v1/messages", "anthropic"), "v1/messages");
        assert_eq!(strip_provider_prefix("v1/messages", "anthropic"), "v1/messages");
        assert_eq!(strip_provider_prefix("anthropic", "anthropic"), "");
        // A segment merely starting with the prefix is not the prefix
        assert_eq!(
            strip_provider_prefix("anthropic-beta/v1", "anthropic"),
            "anthropic-beta/v1"
        );
    }

    #[test]
    fn test_build_url_passes_query_through() {
        let engine = test_engine("https://api.anthropic.com");

        let url = engine.build_url("v1/messages", None).unwrap();
        assert_eq!(url.as_str(), "https://api.anthropic.com/v1/messages");

        let url = engine
            .build_url("v1/messages", Some("beta=tools-2024&raw=a%20b"))
            .unwrap();
        assert_eq!(url.query(), Some("beta=tools-2024&raw=a%20b"));
    }

    fn test_engine(base_url: &str) -> ForwardEngine {
        let cfg = crate::config::UpstreamConfig {
            base_url: base_url.to_string(),
            api_key: "sk-test".to_string(),
            organization: None,
            timeout_secs: 5,
        };
        let target = UpstreamTarget::key_auth("anthropic", "anthropic", &cfg).unwrap();
        let manager = Arc::new(ClientManager::new(&target, 4, 3).unwrap());
        ForwardEngine::new(target, manager, false)
    }
}
