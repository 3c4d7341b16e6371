//! Host discovery
//!
//! The [`HostDiscoverer`] finds a reachable backend address:
//!
//! ```text
//!            discover()
//!                │
//!       in flight already? ── yes ──► None (no-op)
//!                │ no
//!       device disconnected? ── yes ─► None
//!                │ no
//!        cached host probes ok? ── yes ─► Some(cached)
//!                │ no / none
//!     candidates[0], [1], ... in order
//!                │ first probe ok
//!                ▼
//!    HostRegistry::set_cached + ConfigStore::refresh ─► Some(candidate)
//! ```
//!
//! Probes run strictly one after another: candidate N+1 is not touched
//! until every attempt on candidate N failed. Failures are logged and end
//! in `None`; nothing here returns an error to the caller.
//!
//! [`HostDiscoverer::resolve`] is the waiting variant: a caller that finds
//! a run in flight gets that run's result rather than the no-op `None`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config_store::ConfigStore;
use crate::probe::ConnectionProbe;
use crate::registry::HostRegistry;
use crate::traits::ConnectivitySource;

/// Holds the single-flight slot for one run
///
/// On drop the flag is cleared first and the outcome published second, so
/// anyone who saw the flag set is guaranteed to observe the publish. A
/// run dropped mid-way publishes `None`.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
    outcome: &'a watch::Sender<Option<String>>,
    result: Option<String>,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, outcome: &'a watch::Sender<Option<String>>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag,
                outcome,
                result: None,
            })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.outcome.send_replace(self.result.take());
    }
}

/// Single-flight backend host discovery
pub struct HostDiscoverer {
    registry: Arc<HostRegistry>,
    probe: ConnectionProbe,
    config: Arc<ConfigStore>,
    connectivity: Option<Arc<dyn ConnectivitySource>>,
    in_flight: AtomicBool,
    outcome: watch::Sender<Option<String>>,
}

impl HostDiscoverer {
    pub fn new(
        registry: Arc<HostRegistry>,
        probe: ConnectionProbe,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            registry,
            probe,
            config,
            connectivity: None,
            in_flight: AtomicBool::new(false),
            outcome: watch::channel(None).0,
        }
    }

    /// Skip discovery while `source` reports the device as disconnected
    pub fn with_connectivity(mut self, source: Arc<dyn ConnectivitySource>) -> Self {
        self.connectivity = Some(source);
        self
    }

    /// Whether a discovery run is currently executing
    pub fn is_discovering(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    /// Find a reachable backend address
    ///
    /// Returns `None` when another run is already in flight, when the
    /// device is offline, or when no address answered. Callers keep using
    /// the previous config in every `None` case.
    pub async fn discover(&self) -> Option<String> {
        let Some(guard) = FlightGuard::acquire(&self.in_flight, &self.outcome) else {
            debug!("Discovery already running, skipping");
            return None;
        };
        self.run(guard).await
    }

    /// Like [`discover`](Self::discover), but a caller arriving while a run
    /// is in flight waits for that run and gets its result instead of `None`
    ///
    /// For callers that need an answer (login, reactor startup) rather
    /// than duplicate triggers.
    pub async fn resolve(&self) -> Option<String> {
        // subscribe before looking at the flag so the publish cannot be missed
        let mut finished = self.outcome.subscribe();
        if let Some(guard) = FlightGuard::acquire(&self.in_flight, &self.outcome) {
            return self.run(guard).await;
        }

        debug!("Discovery already running, waiting for its result");
        if finished.changed().await.is_err() {
            return None;
        }
        let result = finished.borrow_and_update().clone();
        result
    }

    async fn run(&self, mut guard: FlightGuard<'_>) -> Option<String> {
        let result = self.search().await;
        guard.result = result.clone();
        result
    }

    async fn search(&self) -> Option<String> {
        info!("Starting backend discovery");

        if !self.device_connected().await {
            warn!("No network connection, skipping discovery");
            return None;
        }

        let cached = self.registry.get_cached().await;
        if let Some(address) = cached.as_deref() {
            debug!("Testing cached host {}", address);
            if self.probe.probe_default(address).await {
                info!("Cached host {} still reachable", address);
                self.config.refresh().await;
                return Some(address.to_string());
            }
            info!("Cached host {} failed, searching candidates", address);
        }

        let candidates = self.registry.list_candidates();
        debug!("Testing {} candidate(s)", candidates.len());

        for candidate in candidates {
            if cached.as_deref() == Some(candidate.as_str()) {
                // already exhausted its attempts above
                continue;
            }
            if self.probe.probe_default(candidate).await {
                info!("Found reachable backend at {}", candidate);
                self.confirm(candidate).await;
                return Some(candidate.clone());
            }
        }

        warn!("No reachable backend found");
        None
    }

    /// Probe an explicitly chosen address and adopt it on success
    ///
    /// Does not take the single-flight slot: this is a user action, not a
    /// discovery run.
    pub async fn adopt(&self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            warn!("Refusing to adopt an empty backend address");
            return false;
        }
        if !self.probe.probe_default(address).await {
            warn!("Backend {} is not reachable, keeping current host", address);
            return false;
        }
        self.confirm(address).await;
        true
    }

    async fn confirm(&self, address: &str) {
        if let Err(e) = self.registry.set_cached(address).await {
            error!("Failed to persist backend host {}: {}", address, e);
        }
        self.config.refresh().await;
    }

    async fn device_connected(&self) -> bool {
        let Some(source) = &self.connectivity else {
            return true;
        };
        match source.current().await {
            Ok(status) => status.connected,
            Err(e) => {
                warn!("Could not read connectivity status, probing anyway: {}", e);
                true
            }
        }
    }
}

impl std::fmt::Debug for HostDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDiscoverer")
            .field("registry", &self.registry)
            .field("probe", &self.probe)
            .field("in_flight", &self.is_discovering())
            .finish_non_exhaustive()
    }
}
