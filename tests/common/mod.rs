//! Shared test helpers
//!
//! Spawns a real Relay server on an ephemeral port with both upstreams
//! pointed at caller-provided URLs (normally wiremock servers).

use std::sync::Arc;

use relay::{routes, AppState, Config, UpstreamConfig};

/// A running Relay instance under test
pub struct TestApp {
    /// Base URL of the running proxy, e.g. `http://127.0.0.1:41234`
    pub base_url: String,
    /// Shared state, exposed so tests can observe pool manager internals
    pub state: Arc<AppState>,
}

/// Spawn the proxy with the given upstream base URLs
pub async fn spawn_app(anthropic_url: &str, openai_url: &str, error_threshold: u32) -> TestApp {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        anthropic: UpstreamConfig {
            base_url: anthropic_url.to_string(),
            api_key: "sk-ant-server-key".to_string(),
            organization: None,
            timeout_secs: 5,
        },
        openai: UpstreamConfig {
            base_url: openai_url.to_string(),
            api_key: "sk-openai-server-key".to_string(),
            organization: Some("org-relay-test".to_string()),
            timeout_secs: 5,
        },
        verbose_logging: false,
        pool_max_idle_per_host: 4,
        error_threshold,
    };

    let state = Arc::new(AppState::new(config).expect("failed to build app state"));
    let app = routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        state,
    }
}
