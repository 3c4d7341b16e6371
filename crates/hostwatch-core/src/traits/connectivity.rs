// # Connectivity Source Trait
//
// Device connectivity as seen by the platform shell (Wi-Fi, cellular,
// hotspot, emulator bridge). The network reactor reads the current status
// once per discovery and reacts to every status change from `watch()`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Kind of link the device is using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Wifi,
    Cellular,
    None,
    #[default]
    Unknown,
}

/// A connectivity snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    /// Whether the device has any usable link
    pub connected: bool,
    /// Link kind, if the platform reports one
    pub kind: ConnectionKind,
}

impl ConnectivityStatus {
    pub fn connected(kind: ConnectionKind) -> Self {
        Self {
            connected: true,
            kind,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            kind: ConnectionKind::None,
        }
    }
}

/// Trait for connectivity sources
///
/// Implementations are observers: they report what the platform says and
/// never decide whether discovery should run.
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
    /// Current connectivity, without waiting for a change
    async fn current(&self) -> Result<ConnectivityStatus, crate::Error>;

    /// Stream of connectivity changes
    ///
    /// Dropping the stream unsubscribes. Each call returns an independent
    /// subscription that only sees changes published after the call.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = ConnectivityStatus> + Send + 'static>>;
}
