// # hostwatch-core
//
// Backend host discovery and connection resilience for a client that has
// to find its backend on an unpredictable local network.
//
// ## Architecture Overview
//
// - **HealthCheck / ConnectionProbe**: bounded-retry reachability checks
// - **HostRegistry**: candidate list plus the persisted last known good host
// - **HostDiscoverer**: single-flight, ordered search for a reachable host
// - **NetworkReactor**: rediscovery on connectivity changes
// - **ConfigStore**: base URLs derived from the resolved host
// - **RequestGuard**: local token-expiry check around every API call
// - **Hostwatch**: the service handle wiring all of the above
//
// ## Design Principles
//
// 1. **Traits at the edges**: network, storage and connectivity are
//    reached only through traits, so the core has no HTTP dependency
// 2. **Degrade, don't fail**: discovery, the reactor and the guard log
//    and fall back instead of returning errors
// 3. **Explicit lifecycle**: no globals; callers hold a `Hostwatch` handle

pub mod auth;
pub mod client;
pub mod config;
pub mod config_store;
pub mod connectivity;
pub mod discovery;
pub mod error;
pub mod events;
pub mod probe;
pub mod reactor;
pub mod registry;
pub mod service;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use auth::{Authenticator, RequestGuard, Session, TokenExpiry, UserProfile};
pub use client::ApiClient;
pub use config::{ApiConfig, HostwatchConfig, Platform, ProbeConfig, ProbeTarget, StoreConfig};
pub use config_store::{ConfigStore, ServiceConfig};
pub use connectivity::ChannelConnectivity;
pub use discovery::HostDiscoverer;
pub use error::{Error, Result};
pub use events::{EventBus, Signal};
pub use probe::ConnectionProbe;
pub use reactor::NetworkReactor;
pub use registry::{HostRegistry, HostSource, ResolvedHost};
pub use service::Hostwatch;
pub use store::{FileStore, MemoryStore};
pub use traits::{
    ApiRequest, ApiResponse, ConnectivitySource, ConnectivityStatus, HealthCheck, KeyValueStore,
    Method, Transport,
};
