// # Channel Connectivity
//
// A ConnectivitySource fed by the host shell. The platform's network
// plugin calls `publish()` on every status change; the reactor consumes
// the changes through `watch()`.

use async_trait::async_trait;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use crate::traits::{ConnectivitySource, ConnectivityStatus};

/// Buffered status changes per subscriber
const CHANNEL_CAPACITY: usize = 64;

/// Connectivity source driven by explicit `publish()` calls
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ChannelConnectivity {
    tx: broadcast::Sender<ConnectivityStatus>,
    current: std::sync::Arc<std::sync::Mutex<ConnectivityStatus>>,
}

impl ChannelConnectivity {
    /// Create a source reporting `initial` until the first publish
    pub fn new(initial: ConnectivityStatus) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            current: std::sync::Arc::new(std::sync::Mutex::new(initial)),
        }
    }

    /// Record a new status and notify every watcher
    pub fn publish(&self, status: ConnectivityStatus) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;

        if self.tx.send(status).is_err() {
            tracing::trace!("No connectivity watchers, status change recorded only");
        }
    }

    /// Number of live `watch()` subscriptions
    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl ConnectivitySource for ChannelConnectivity {
    async fn current(&self) -> Result<ConnectivityStatus, crate::Error> {
        Ok(*self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = ConnectivityStatus> + Send + 'static>> {
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(|item| match item {
            Ok(status) => Some(status),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Connectivity watcher lagged, {} changes dropped", skipped);
                None
            }
        });
        Box::pin(stream)
    }
}
