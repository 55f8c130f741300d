//! Error types for Relay
//!
//! Transport failures are represented as a classified enum rather than a
//! chain of exception handlers, so the status mapping and the pool-failure
//! split are plain data that tests can pin down.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Classified transport-level proxy errors
///
/// A non-2xx/3xx status from a successfully contacted upstream is *not* one
/// of these: application errors stream back verbatim. Only failures where no
/// upstream response was obtained are classified here.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Upstream accepted the connection but the response stalled
    #[error("read timeout while waiting for upstream")]
    ReadTimeout,

    /// Upstream never completed the connection handshake in time
    #[error("connect timeout while contacting upstream")]
    ConnectTimeout,

    /// No free pooled connection became available in time
    #[error("no upstream connection available")]
    PoolTimeout,

    /// Connection reset, DNS failure, TLS failure and similar
    #[error("upstream network failure")]
    Network,

    /// Upstream redirect loop exceeded the redirect limit
    #[error("too many redirects from upstream")]
    TooManyRedirects,

    /// The outbound URL could not be constructed
    #[error("invalid upstream URL")]
    InvalidUrl,

    /// Other request-construction or transport error
    #[error("upstream request error")]
    Request,

    /// Anything the classifier could not attribute
    #[error("unexpected proxy error")]
    Unexpected,
}

impl ProxyError {
    /// HTTP status returned to the inbound caller
    pub fn status(&self) -> StatusCode {
        let code = match self {
            ProxyError::ReadTimeout => 408,
            ProxyError::ConnectTimeout => 408,
            ProxyError::PoolTimeout => 503,
            ProxyError::Network => 503,
            ProxyError::TooManyRedirects => 310,
            ProxyError::InvalidUrl => 400,
            ProxyError::Request => 500,
            ProxyError::Unexpected => 500,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether this failure counts toward the pool manager's consecutive
    /// failure streak
    ///
    /// Timeouts and errors that indicate upstream or pool exhaustion trigger
    /// recycling; purely client-side issues (bad URL, redirect loop) and read
    /// stalls on an established connection do not penalize a healthy pool.
    pub fn counts_as_pool_failure(&self) -> bool {
        match self {
            ProxyError::ConnectTimeout
            | ProxyError::PoolTimeout
            | ProxyError::Network
            | ProxyError::Request
            | ProxyError::Unexpected => true,
            ProxyError::ReadTimeout | ProxyError::TooManyRedirects | ProxyError::InvalidUrl => {
                false
            }
        }
    }

    /// Stable machine-readable code for the JSON error body
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::ReadTimeout => "READ_TIMEOUT",
            ProxyError::ConnectTimeout => "CONNECT_TIMEOUT",
            ProxyError::PoolTimeout => "POOL_TIMEOUT",
            ProxyError::Network => "UPSTREAM_UNAVAILABLE",
            ProxyError::TooManyRedirects => "TOO_MANY_REDIRECTS",
            ProxyError::InvalidUrl => "INVALID_URL",
            ProxyError::Request => "REQUEST_ERROR",
            ProxyError::Unexpected => "UNEXPECTED_ERROR",
        }
    }

    /// Classify a transport error reported by the HTTP client
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                ProxyError::ConnectTimeout
            } else {
                ProxyError::ReadTimeout
            }
        } else if err.is_redirect() {
            ProxyError::TooManyRedirects
        } else if err.is_builder() {
            ProxyError::InvalidUrl
        } else if err.is_connect() {
            ProxyError::Network
        } else if err.is_request() || err.is_body() {
            ProxyError::Request
        } else {
            ProxyError::Unexpected
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
///
/// Messages are short and stable; transport internals stay in server-side
/// logs and never reach the response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for forwarding operations
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(ProxyError::ReadTimeout.status().as_u16(), 408);
        assert_eq!(ProxyError::ConnectTimeout.status().as_u16(), 408);
        assert_eq!(ProxyError::PoolTimeout.status().as_u16(), 503);
        assert_eq!(ProxyError::Network.status().as_u16(), 503);
        assert_eq!(ProxyError::TooManyRedirects.status().as_u16(), 310);
        assert_eq!(ProxyError::InvalidUrl.status().as_u16(), 400);
        assert_eq!(ProxyError::Request.status().as_u16(), 500);
        assert_eq!(ProxyError::Unexpected.status().as_u16(), 500);
    }

    #[test]
    fn test_pool_failure_split() {
        assert!(!ProxyError::ReadTimeout.counts_as_pool_failure());
        assert!(ProxyError::ConnectTimeout.counts_as_pool_failure());
        assert!(ProxyError::PoolTimeout.counts_as_pool_failure());
        assert!(ProxyError::Network.counts_as_pool_failure());
        assert!(!ProxyError::TooManyRedirects.counts_as_pool_failure());
        assert!(!ProxyError::InvalidUrl.counts_as_pool_failure());
        assert!(ProxyError::Request.counts_as_pool_failure());
        assert!(ProxyError::Unexpected.counts_as_pool_failure());
    }

    #[test]
    fn test_error_body_has_no_internals() {
        let rendered = ProxyError::Network.to_string();
        assert_eq!(rendered, "upstream network failure");
    }

    #[tokio::test]
    async fn test_into_response_shape() {
        let response = ProxyError::PoolTimeout.into_response();
        assert_eq!(response.status().as_u16(), 503);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "POOL_TIMEOUT");
        assert!(body["error"]["message"].is_string());
    }
}
