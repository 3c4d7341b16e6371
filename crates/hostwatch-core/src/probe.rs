//! Connection probe
//!
//! Wraps a [`HealthCheck`] with the attempt budget, the per-attempt
//! deadline and the backoff between failed attempts. A probe only answers
//! "reachable or not"; it never touches the registry, the config or the
//! store.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ProbeConfig;
use crate::traits::HealthCheck;

/// Bounded-retry reachability check for one address at a time
#[derive(Clone)]
pub struct ConnectionProbe {
    check: Arc<dyn HealthCheck>,
    timeout: Duration,
    backoff: Duration,
    attempts: u32,
}

impl ConnectionProbe {
    pub fn new(check: Arc<dyn HealthCheck>, config: &ProbeConfig) -> Self {
        Self {
            check,
            timeout: config.timeout(),
            backoff: config.backoff(),
            attempts: config.attempts,
        }
    }

    /// Attempt budget used by [`probe_default`](Self::probe_default)
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Probe with the configured attempt budget
    pub async fn probe_default(&self, address: &str) -> bool {
        self.probe(address, self.attempts).await
    }

    /// Probe `address` up to `attempts` times
    ///
    /// Each attempt is cancelled when it exceeds the deadline; a cancelled
    /// attempt is a failed attempt. Returns `false` only after every
    /// attempt failed. An `attempts` of 0 is treated as 1.
    pub async fn probe(&self, address: &str, attempts: u32) -> bool {
        let attempts = attempts.max(1);

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, self.check.check(address)).await {
                Ok(Ok(())) => {
                    info!("Backend reachable via {} (attempt {}/{})", address, attempt, attempts);
                    return true;
                }
                Ok(Err(e)) => {
                    debug!("Probe {} attempt {}/{} failed: {}", address, attempt, attempts, e);
                }
                Err(_) => {
                    debug!(
                        "Probe {} attempt {}/{} timed out after {:?}",
                        address, attempt, attempts, self.timeout
                    );
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        debug!("Probe {} exhausted {} attempt(s)", address, attempts);
        false
    }
}

impl std::fmt::Debug for ConnectionProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProbe")
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .field("attempts", &self.attempts)
            .finish()
    }
}
