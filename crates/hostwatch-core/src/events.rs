//! Process-wide signals
//!
//! An in-process publish/subscribe bus replacing ad hoc window events.
//! Every subscriber gets every signal published after it subscribed,
//! exactly once.

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Buffered signals per subscriber
const BUS_CAPACITY: usize = 128;

/// Signals emitted by hostwatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The session is no longer valid; consumers must force re-authentication
    AuthExpired,

    /// The resolved backend host changed
    BackendHostChanged {
        address: String,
    },

    /// The UI asked for a pull-to-refresh
    RefreshRequested,
}

impl Signal {
    /// Wire-style name of the signal
    pub fn name(&self) -> &'static str {
        match self {
            Signal::AuthExpired => "auth-expired",
            Signal::BackendHostChanged { .. } => "backend-ip-changed",
            Signal::RefreshRequested => "refresh-requested",
        }
    }
}

/// Handle to the signal bus; clones publish to the same subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Signal>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Subscribe to every signal published from now on
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }

    /// Publish a signal now
    pub fn emit(&self, signal: Signal) {
        let name = signal.name();
        match self.tx.send(signal) {
            Ok(receivers) => debug!("Signal {} delivered to {} subscriber(s)", name, receivers),
            Err(_) => debug!("Signal {} emitted with no subscribers", name),
        }
    }

    /// Publish a signal after the caller's current turn completes
    ///
    /// The caller's continuation runs before any subscriber can observe
    /// the signal. Outside a tokio runtime the signal is published
    /// immediately.
    pub fn emit_deferred(&self, signal: Signal) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let bus = self.clone();
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    bus.emit(signal);
                });
            }
            Err(_) => {
                warn!("No async runtime for deferred signal, emitting inline");
                self.emit(signal);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
