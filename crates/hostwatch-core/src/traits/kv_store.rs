// # Key-Value Store Trait
//
// Device-local, unencrypted string entries. The subsystem uses:
//
// - `backend_ip`: last address that passed a probe
// - `access_token`: bearer token
// - `user`: serialized session profile
//
// Writes happen through explicit calls only. `backend_ip` has a single
// writer (the host discoverer), so no cross-entry locking is needed.

use async_trait::async_trait;

/// Key holding the last known good backend address
pub const BACKEND_IP_KEY: &str = "backend_ip";
/// Key holding the bearer token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key holding the serialized user profile
pub const USER_KEY: &str = "user";

/// Trait for key-value store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read an entry
    ///
    /// - `Ok(Some(value))`: entry present
    /// - `Ok(None)`: no such entry
    /// - `Err(Error)`: storage error
    async fn get(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Create or overwrite an entry
    async fn set(&self, key: &str, value: &str) -> Result<(), crate::Error>;

    /// Remove an entry (missing entries are not an error)
    async fn remove(&self, key: &str) -> Result<(), crate::Error>;

    /// All keys currently stored
    async fn keys(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
