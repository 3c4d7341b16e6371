//! Minimal embedding example for hostwatch-core
//!
//! Wires the subsystem the way a UI shell would: the shell owns the
//! lifecycle, pushes connectivity changes in and listens for signals.
//!
//! By default the backend is simulated in-process. Pass `--live` to probe
//! and call the configured backend over HTTP instead.

use anyhow::Context;
use hostwatch_core::traits::{
    ApiRequest, ApiResponse, ConnectionKind, ConnectivityStatus, HealthCheck, Transport,
};
use hostwatch_core::{ChannelConnectivity, Hostwatch, HostwatchConfig, MemoryStore, Platform};
use hostwatch_http::{HttpHealthCheck, ReqwestTransport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Simulated LAN: only `backend` answers health checks
struct SimulatedLan {
    backend: Mutex<String>,
}

impl SimulatedLan {
    fn new(backend: &str) -> Arc<Self> {
        Arc::new(Self {
            backend: Mutex::new(backend.to_string()),
        })
    }

    /// Move the backend to another address (DHCP lease change, new hotspot)
    fn move_backend(&self, address: &str) {
        *self.backend.lock().unwrap_or_else(|p| p.into_inner()) = address.to_string();
    }

    fn is_backend(&self, address: &str) -> bool {
        *self.backend.lock().unwrap_or_else(|p| p.into_inner()) == address
    }
}

#[async_trait::async_trait]
impl HealthCheck for SimulatedLan {
    async fn check(&self, address: &str) -> hostwatch_core::Result<()> {
        if self.is_backend(address) {
            Ok(())
        } else {
            Err(hostwatch_core::Error::probe(format!("{address}: no route to host")))
        }
    }
}

#[async_trait::async_trait]
impl Transport for SimulatedLan {
    async fn send(&self, request: ApiRequest) -> hostwatch_core::Result<ApiResponse> {
        info!("[backend] {} {}", request.method, request.url);
        Ok(ApiResponse::json_body(200, "OK", &serde_json::json!([])))
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let level = match std::env::var("HOSTWATCH_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let live = std::env::args().any(|arg| arg == "--live");

    let mut config = HostwatchConfig::from_env()?;
    config.platform = Platform::Native;
    if !live {
        config.candidates = vec!["192.168.8.184".into(), "192.168.1.3".into(), "10.0.2.2".into()];
        config.probe.backoff_ms = 100;
    }

    let connectivity = Arc::new(ChannelConnectivity::new(ConnectivityStatus::connected(
        ConnectionKind::Wifi,
    )));
    let lan = SimulatedLan::new("192.168.1.3");

    let health: Arc<dyn HealthCheck> = if live {
        Arc::new(HttpHealthCheck::new(config.probe.target.clone()))
    } else {
        lan.clone() as Arc<dyn HealthCheck>
    };
    let transport: Arc<dyn Transport> = if live {
        Arc::new(ReqwestTransport::new())
    } else {
        lan.clone() as Arc<dyn Transport>
    };

    let hostwatch = Hostwatch::new(
        config,
        Arc::new(MemoryStore::new()),
        health,
        connectivity.clone(),
        transport,
    )?;

    let mut signals = hostwatch.events().subscribe();
    tokio::spawn(async move {
        while let Ok(signal) = signals.recv().await {
            info!("[shell] signal {}: {:?}", signal.name(), signal);
        }
    });

    let config = hostwatch
        .init(|host| info!("[shell] backend host is now {}", host))
        .await;
    info!("Initial base URL: {}", config.base_url);

    tokio::time::sleep(Duration::from_secs(1)).await;

    if !live {
        info!("Simulating a network switch");
        lan.move_backend("10.0.2.2");
        connectivity.publish(ConnectivityStatus::disconnected());
        connectivity.publish(ConnectivityStatus::connected(ConnectionKind::Cellular));
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    match hostwatch.client().get("/api/v1/orders").await {
        Ok(response) => info!("GET /api/v1/orders -> {}", response.status),
        Err(e) => warn!("GET /api/v1/orders failed: {}", e),
    }

    info!(
        "Last known host: {}",
        hostwatch.last_known_host().await.as_deref().unwrap_or("none")
    );

    hostwatch.dispose();
    Ok(())
}
