//! Configuration management for Relay
//!
//! Configuration is loaded from environment variables once at startup.
//! Missing secrets or malformed values are fatal here, never per-request.

use anyhow::{Context, Result};
use std::env;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Per-request timeout bounds in seconds
pub const TIMEOUT_BOUNDS_SECS: (u64, u64) = (1, 120);
/// Default consecutive-failure count before the pooled client is recycled
pub const DEFAULT_ERROR_THRESHOLD: u32 = 10;
/// Default keep-alive connection limit per upstream host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 20;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Anthropic upstream (key-header auth)
    pub anthropic: UpstreamConfig,
    /// OpenAI upstream (bearer-token auth)
    pub openai: UpstreamConfig,

    /// Buffer and log request bodies before forwarding (latency trade-off)
    pub verbose_logging: bool,
    /// Keep-alive connections per upstream host
    pub pool_max_idle_per_host: usize,
    /// Consecutive counting failures before the pooled client is recycled
    pub error_threshold: u32,
}

/// Per-provider upstream settings
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API
    pub base_url: String,
    /// Provider secret, injected by the header sanitizer
    pub api_key: String,
    /// Organization header value (OpenAI only)
    pub organization: Option<String>,
    /// Per-request timeout in seconds, clamped to [1, 120]
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid RELAY_PORT")?,

            anthropic: UpstreamConfig {
                base_url: env::var("ANTHROPIC_API_BASE_URL")
                    .context("ANTHROPIC_API_BASE_URL must be set")?,
                api_key: env::var("ANTHROPIC_API_KEY")
                    .context("ANTHROPIC_API_KEY must be set")?,
                organization: None,
                timeout_secs: timeout_from_env("ANTHROPIC_TIMEOUT")?,
            },

            openai: UpstreamConfig {
                base_url: env::var("OPENAI_API_BASE_URL")
                    .context("OPENAI_API_BASE_URL must be set")?,
                api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
                organization: env::var("OPENAI_ORG").ok(),
                timeout_secs: timeout_from_env("OPENAI_TIMEOUT")?,
            },

            verbose_logging: env::var("VERBOSE_LOGGING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),

            pool_max_idle_per_host: env::var("POOL_MAX_IDLE_PER_HOST")
                .unwrap_or_else(|_| DEFAULT_POOL_MAX_IDLE_PER_HOST.to_string())
                .parse()
                .context("Invalid POOL_MAX_IDLE_PER_HOST")?,

            error_threshold: env::var("ERROR_THRESHOLD")
                .unwrap_or_else(|_| DEFAULT_ERROR_THRESHOLD.to_string())
                .parse()
                .context("Invalid ERROR_THRESHOLD")?,
        })
    }
}

/// Clamp a per-request timeout to the supported range
pub fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(TIMEOUT_BOUNDS_SECS.0, TIMEOUT_BOUNDS_SECS.1)
}

fn timeout_from_env(var: &str) -> Result<u64> {
    let secs = match env::var(var) {
        Ok(raw) => raw.parse().with_context(|| format!("Invalid {}", var))?,
        Err(_) => DEFAULT_TIMEOUT_SECS,
    };
    Ok(clamp_timeout(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_timeout_bounds() {
        assert_eq!(clamp_timeout(0), 1);
        assert_eq!(clamp_timeout(1), 1);
        assert_eq!(clamp_timeout(60), 60);
        assert_eq!(clamp_timeout(120), 120);
        assert_eq!(clamp_timeout(9999), 120);
    }

    #[test]
    fn test_timeout_from_env_default_and_clamp() {
        env::remove_var("TEST_TIMEOUT_UNSET");
        assert_eq!(timeout_from_env("TEST_TIMEOUT_UNSET").unwrap(), 60);

        env::set_var("TEST_TIMEOUT_HIGH", "500");
        assert_eq!(timeout_from_env("TEST_TIMEOUT_HIGH").unwrap(), 120);
        env::remove_var("TEST_TIMEOUT_HIGH");

        env::set_var("TEST_TIMEOUT_BAD", "not-a-number");
        assert!(timeout_from_env("TEST_TIMEOUT_BAD").is_err());
        env::remove_var("TEST_TIMEOUT_BAD");
    }
}
