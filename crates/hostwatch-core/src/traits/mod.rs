//! Core traits for hostwatch
//!
//! These are the seams between the discovery logic and the outside world.
//!
//! - [`HealthCheck`]: One reachability attempt against one address
//! - [`ConnectivitySource`]: Device connectivity status and changes
//! - [`KeyValueStore`]: Persistent device-local string entries
//! - [`Transport`]: Raw request/response exchange with the backend

pub mod connectivity;
pub mod health_check;
pub mod kv_store;
pub mod transport;

pub use connectivity::{ConnectionKind, ConnectivitySource, ConnectivityStatus};
pub use health_check::HealthCheck;
pub use kv_store::KeyValueStore;
pub use transport::{ApiRequest, ApiResponse, Method, Transport};
