//! Self-healing connection pool management
//!
//! Each provider gets one [`ClientManager`] owning a pooled `reqwest::Client`
//! bound to that provider's upstream. After a run of consecutive counting
//! failures the client is swapped for a fresh one, which discards any
//! poisoned keep-alive connections without dropping requests already in
//! flight (they hold their own reference to the old pool).

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::target::UpstreamTarget;

/// Tighter bound on the connect phase alone, within the total per-request
/// timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the pooled HTTP client for one upstream and recycles it after
/// sustained transport failures
pub struct ClientManager {
    name: &'static str,
    timeout: Duration,
    pool_max_idle_per_host: usize,
    error_threshold: u32,
    state: Mutex<ManagerState>,
}

struct ManagerState {
    /// `None` only after shutdown
    client: Option<reqwest::Client>,
    consecutive_errors: u32,
    /// Bumped on every replacement so recycling is observable
    generation: u64,
}

impl ClientManager {
    /// Construct the manager and its initial pooled client
    ///
    /// A client build failure here is a startup error, not a request error.
    pub fn new(
        target: &UpstreamTarget,
        pool_max_idle_per_host: usize,
        error_threshold: u32,
    ) -> Result<Self> {
        let client = build_client(target.timeout, pool_max_idle_per_host)
            .with_context(|| format!("failed to build HTTP client for {}", target.name))?;

        Ok(Self {
            name: target.name,
            timeout: target.timeout,
            pool_max_idle_per_host,
            error_threshold,
            state: Mutex::new(ManagerState {
                client: Some(client),
                consecutive_errors: 0,
                generation: 0,
            }),
        })
    }

    /// Get the current live client
    ///
    /// O(1): the lock is held only for a handle clone, never for network I/O.
    /// Fails only once the manager has been shut down.
    pub fn acquire(&self) -> ProxyResult<reqwest::Client> {
        self.lock().client.clone().ok_or(ProxyError::Unexpected)
    }

    /// Record one counting transport failure
    ///
    /// At the threshold the client is replaced and the counter resets to 0.
    /// The counter resets *only* via replacement: successes and non-counting
    /// failures leave the streak untouched, so callers simply never report
    /// them. The old client is dropped outside the critical section; its idle
    /// sockets close while in-flight requests finish on their own references.
    pub fn report_failure(&self) {
        // Dropping the old client outside the lock keeps the swap a short,
        // non-blocking critical section.
        let mut retired: Option<reqwest::Client> = None;

        {
            let mut state = self.lock();
            if state.client.is_none() {
                return; // shut down, nothing to recycle
            }

            state.consecutive_errors += 1;
            if state.consecutive_errors < self.error_threshold {
                return;
            }

            match build_client(self.timeout, self.pool_max_idle_per_host) {
                Ok(fresh) => {
                    info!(
                        provider = %self.name,
                        errors = state.consecutive_errors,
                        threshold = self.error_threshold,
                        generation = state.generation + 1,
                        "Recycling HTTP client after consecutive upstream failures"
                    );
                    retired = state.client.replace(fresh);
                    state.consecutive_errors = 0;
                    state.generation += 1;
                }
                Err(err) => {
                    // Keep serving on the old client rather than failing the
                    // reset; counter resets so the next streak retries.
                    error!(provider = %self.name, error = %err, "Failed to build replacement HTTP client");
                    state.consecutive_errors = 0;
                }
            }
        }

        drop(retired);
    }

    /// Close the current client, releasing all pooled connections
    ///
    /// Idempotent. Close problems are logged, never propagated.
    pub fn shutdown(&self) {
        let retired = {
            let mut state = self.lock();
            state.client.take()
        };

        match retired {
            Some(client) => {
                info!(provider = %self.name, "Shutting down pooled HTTP client");
                drop(client);
            }
            None => warn!(provider = %self.name, "Shutdown called on already-closed client manager"),
        }
    }

    /// Current consecutive counting-failure streak
    pub fn consecutive_errors(&self) -> u32 {
        self.lock().consecutive_errors
    }

    /// Number of times the pooled client has been replaced
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        // A panic while holding this lock leaves plain counters and a
        // swappable handle; the state stays usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_client(timeout: Duration, pool_max_idle_per_host: usize) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .build()
}
