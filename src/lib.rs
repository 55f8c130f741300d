//! Relay - Transparent reverse proxy for AI provider APIs
//!
//! This library provides the core functionality for the Relay proxy server:
//! a faithful, low-latency pass-through to upstream AI providers with
//! provider-specific header rewriting and self-healing connection pools.

pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

pub use crate::config::{Config, UpstreamConfig};
pub use crate::error::{ProxyError, ProxyResult};
pub use crate::proxy::{ClientManager, ForwardEngine, UpstreamTarget};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Engine for the Anthropic upstream (key-header auth)
    pub anthropic: ForwardEngine,
    /// Engine for the OpenAI upstream (bearer-token auth)
    pub openai: ForwardEngine,
}

impl AppState {
    /// Create a new application state
    ///
    /// This is the startup hook: it validates both upstream targets and
    /// builds one pool manager and forwarding engine per provider.
    /// Configuration problems fail here, never per-request.
    pub fn new(config: Config) -> Result<Self> {
        let anthropic_target = UpstreamTarget::key_auth("anthropic", "anthropic", &config.anthropic)?;
        let openai_target = UpstreamTarget::bearer_auth("openai", "openai", &config.openai)?;

        let anthropic_manager = Arc::new(ClientManager::new(
            &anthropic_target,
            config.pool_max_idle_per_host,
            config.error_threshold,
        )?);
        let openai_manager = Arc::new(ClientManager::new(
            &openai_target,
            config.pool_max_idle_per_host,
            config.error_threshold,
        )?);

        let verbose = config.verbose_logging;
        Ok(Self {
            anthropic: ForwardEngine::new(anthropic_target, anthropic_manager, verbose),
            openai: ForwardEngine::new(openai_target, openai_manager, verbose),
            config,
            start_time: Instant::now(),
        })
    }

    /// Release all pooled connections for both providers
    ///
    /// The shutdown hook, called once after the server stops serving.
    /// Idempotent; close problems are logged by the managers, not returned.
    pub fn shutdown(&self) {
        info!("Closing pooled upstream clients");
        self.anthropic.manager().shutdown();
        self.openai.manager().shutdown();
    }
}
