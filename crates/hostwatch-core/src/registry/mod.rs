//! Host registry
//!
//! Holds the static candidate list and the last known good host. The host
//! lives in memory and is mirrored to the `backend_ip` store entry; the
//! in-memory copy saves a store read on every lookup.
//!
//! ## Single writer
//!
//! Only [`HostDiscoverer`](crate::discovery::HostDiscoverer) calls
//! [`HostRegistry::set_cached`], and only after a probe succeeded. Stale
//! entries are superseded, never deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::normalize_candidates;
use crate::error::Result;
use crate::traits::KeyValueStore;
use crate::traits::kv_store::BACKEND_IP_KEY;

/// Where the registry's current host came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostSource {
    /// Loaded from the persistent store
    Cache,
    /// Confirmed by a probe in this process
    Probed,
}

/// The address currently believed to reach the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHost {
    pub address: String,
    pub discovered_at: DateTime<Utc>,
    pub source: HostSource,
}

impl ResolvedHost {
    pub(crate) fn new(address: impl Into<String>, source: HostSource) -> Self {
        Self {
            address: address.into(),
            discovered_at: Utc::now(),
            source,
        }
    }
}

/// Candidate list plus the persisted last known good host
pub struct HostRegistry {
    candidates: Vec<String>,
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<ResolvedHost>>,
}

impl HostRegistry {
    /// Create a registry over `candidates` (de-duplicated, order kept)
    pub fn new(candidates: &[String], store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            candidates: normalize_candidates(candidates),
            store,
            current: RwLock::new(None),
        }
    }

    /// Candidates in priority order
    pub fn list_candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Highest-priority candidate
    pub fn primary_candidate(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }

    /// Last known good address, if any
    ///
    /// Store read failures are logged and reported as "no cached host".
    pub async fn get_cached(&self) -> Option<String> {
        self.resolved().await.map(|host| host.address)
    }

    /// Last known good host with its metadata
    pub async fn resolved(&self) -> Option<ResolvedHost> {
        if let Some(host) = self.current.read().await.as_ref() {
            return Some(host.clone());
        }

        let stored = match self.store.get(BACKEND_IP_KEY).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty())?,
            Err(e) => {
                warn!("Failed to read cached backend host: {}", e);
                return None;
            }
        };

        let mut current = self.current.write().await;
        // another task may have filled it while we read the store
        let host = current
            .get_or_insert_with(|| ResolvedHost::new(stored.trim(), HostSource::Cache))
            .clone();
        debug!("Loaded cached backend host {}", host.address);
        Some(host)
    }

    /// Record a probe-confirmed address in memory and in the store
    ///
    /// The in-memory copy is updated even if the store write fails, so the
    /// running process keeps using the confirmed host.
    pub async fn set_cached(&self, address: &str) -> Result<()> {
        *self.current.write().await = Some(ResolvedHost::new(address, HostSource::Probed));
        self.store.set(BACKEND_IP_KEY, address).await
    }
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRegistry")
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}
