// # Health Check Trait
//
// A health check performs exactly one reachability attempt. It owns no
// retry policy, no timeout and no backoff; `ConnectionProbe` adds those.

use async_trait::async_trait;

/// A single reachability attempt against a backend address
///
/// # Contract
///
/// - `Ok(())` means the attempt counts as a success
/// - `Err(_)` means the attempt failed (status, transport, anything)
/// - Must not retry or sleep
/// - Must be cancellation-safe: the caller drops the future on timeout
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Run one attempt against `address`
    async fn check(&self, address: &str) -> Result<(), crate::Error>;
}
