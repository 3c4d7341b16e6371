//! Network reactor
//!
//! Re-runs discovery whenever the device regains or changes connectivity
//! and reports the resolved host only when it actually changed.
//!
//! ## Event Flow
//!
//! 1. `start()` subscribes to connectivity changes, then runs one discovery
//!    (or waits for the one already in flight)
//! 2. A successful startup discovery is remembered and reported
//! 3. Every "connected" change triggers a fresh discovery
//! 4. A result different from the remembered host is remembered, reported
//!    to the callback and broadcast as [`Signal::BackendHostChanged`]
//! 5. "Disconnected" changes are logged and otherwise ignored
//!
//! `stop()` drops the subscription. A discovery already running when
//! `stop()` is called finishes, but its result is not reported.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::discovery::HostDiscoverer;
use crate::events::{EventBus, Signal};
use crate::traits::{ConnectivitySource, ConnectivityStatus};

type StatusStream = Pin<Box<dyn Stream<Item = ConnectivityStatus> + Send + 'static>>;
type HostChangedCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Connectivity-driven rediscovery
pub struct NetworkReactor {
    discoverer: Arc<HostDiscoverer>,
    connectivity: Arc<dyn ConnectivitySource>,
    events: EventBus,
    last_host: Arc<Mutex<Option<String>>>,
    worker: Mutex<Option<Worker>>,
}

impl NetworkReactor {
    pub fn new(
        discoverer: Arc<HostDiscoverer>,
        connectivity: Arc<dyn ConnectivitySource>,
        events: EventBus,
    ) -> Self {
        Self {
            discoverer,
            connectivity,
            events,
            last_host: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        }
    }

    /// Start watching connectivity
    ///
    /// Must be called inside a tokio runtime. Calling it while already
    /// running is a no-op.
    pub fn start<F>(&self, on_host_changed: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut worker = lock(&self.worker);
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            debug!("Network reactor already running");
            return;
        }

        info!("Starting network reactor");

        let changes = self.connectivity.watch();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = ReactorTask {
            discoverer: Arc::clone(&self.discoverer),
            events: self.events.clone(),
            last_host: Arc::clone(&self.last_host),
            on_host_changed: Arc::new(on_host_changed),
        };

        let handle = tokio::spawn(task.run(changes, shutdown_rx));
        *worker = Some(Worker {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Stop watching connectivity; safe to call at any time, any number of times
    pub fn stop(&self) {
        if let Some(worker) = lock(&self.worker).take() {
            // dropping the sender closes the channel even if the task is busy
            drop(worker.shutdown);
            info!("Network reactor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Host most recently reported by this reactor
    pub fn last_host(&self) -> Option<String> {
        lock(&self.last_host).clone()
    }

    /// Record a host adopted outside the reactor (manual update)
    ///
    /// Returns `true` if it differs from the remembered host.
    pub(crate) fn remember(&self, host: &str) -> bool {
        remember(&self.last_host, host)
    }
}

impl Drop for NetworkReactor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for NetworkReactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkReactor")
            .field("last_host", &self.last_host())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

struct ReactorTask {
    discoverer: Arc<HostDiscoverer>,
    events: EventBus,
    last_host: Arc<Mutex<Option<String>>>,
    on_host_changed: HostChangedCallback,
}

impl ReactorTask {
    async fn run(self, mut changes: StatusStream, mut shutdown: oneshot::Receiver<()>) {
        let initial = self.discoverer.resolve().await;
        if stopped(&mut shutdown) {
            return;
        }
        if let Some(host) = initial {
            remember(&self.last_host, &host);
            (self.on_host_changed)(&host);
        }

        loop {
            let change = tokio::select! {
                _ = &mut shutdown => break,
                change = changes.next() => change,
            };

            let Some(status) = change else {
                warn!("Connectivity stream ended, network reactor exiting");
                break;
            };

            debug!("Network status changed: {:?}", status);
            if !status.connected {
                warn!("Network disconnected");
                continue;
            }

            let discovered = self.discoverer.discover().await;
            if stopped(&mut shutdown) {
                break;
            }

            let Some(host) = discovered else {
                continue;
            };

            let previous = lock(&self.last_host).clone();
            if remember(&self.last_host, &host) {
                info!(
                    "Backend host changed from {} to {}",
                    previous.as_deref().unwrap_or("none"),
                    host
                );
                (self.on_host_changed)(&host);
                self.events.emit(Signal::BackendHostChanged {
                    address: host.clone(),
                });
            } else {
                debug!("Backend host unchanged ({})", host);
            }
        }
    }
}

/// Whether `stop()` has been called (or the reactor dropped)
fn stopped(shutdown: &mut oneshot::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}

fn remember(slot: &Mutex<Option<String>>, host: &str) -> bool {
    let mut last = lock(slot);
    if last.as_deref() == Some(host) {
        return false;
    }
    *last = Some(host.to_string());
    true
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
