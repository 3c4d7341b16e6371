//! Service lifecycle
//!
//! [`Hostwatch`] wires the registry, probe, discoverer, config store,
//! reactor, session and guarded transport into one handle. Hosts create
//! it once, call [`init`](Hostwatch::init) at startup and
//! [`dispose`](Hostwatch::dispose) at shutdown, and pass the handle (or
//! the parts it exposes) to whatever needs them.

use std::sync::Arc;

use tracing::info;

use crate::auth::{Authenticator, RequestGuard, Session};
use crate::client::ApiClient;
use crate::config::HostwatchConfig;
use crate::config_store::{ConfigStore, ServiceConfig};
use crate::discovery::HostDiscoverer;
use crate::error::Result;
use crate::events::{EventBus, Signal};
use crate::probe::ConnectionProbe;
use crate::reactor::NetworkReactor;
use crate::registry::HostRegistry;
use crate::store;
use crate::traits::{ConnectivitySource, HealthCheck, KeyValueStore, Transport};

/// Backend discovery and connection resilience for one client process
pub struct Hostwatch {
    config: HostwatchConfig,
    registry: Arc<HostRegistry>,
    config_store: Arc<ConfigStore>,
    discoverer: Arc<HostDiscoverer>,
    reactor: NetworkReactor,
    events: EventBus,
    session: Session,
    transport: Arc<dyn Transport>,
    client: ApiClient,
    authenticator: Authenticator,
}

impl Hostwatch {
    /// Wire the subsystem over the given seams
    ///
    /// `transport` is the raw transport; requests made through
    /// [`transport()`](Self::transport) and [`client()`](Self::client) are
    /// guarded.
    pub fn new(
        config: HostwatchConfig,
        store: Arc<dyn KeyValueStore>,
        health_check: Arc<dyn HealthCheck>,
        connectivity: Arc<dyn ConnectivitySource>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new();
        let registry = Arc::new(HostRegistry::new(&config.candidates, store.clone()));
        let config_store = Arc::new(ConfigStore::new(
            config.api.clone(),
            config.platform,
            registry.clone(),
        ));
        let probe = ConnectionProbe::new(health_check, &config.probe);
        let discoverer = Arc::new(
            HostDiscoverer::new(registry.clone(), probe, config_store.clone())
                .with_connectivity(connectivity.clone()),
        );
        let reactor = NetworkReactor::new(discoverer.clone(), connectivity, events.clone());

        let session = Session::new(store);
        let guarded: Arc<dyn Transport> =
            Arc::new(RequestGuard::new(transport, session.clone(), events.clone()));
        let client = ApiClient::new(config_store.clone(), guarded.clone(), session.clone());
        let authenticator = Authenticator::new(
            config_store.clone(),
            discoverer.clone(),
            guarded.clone(),
            session.clone(),
        );

        Ok(Self {
            config,
            registry,
            config_store,
            discoverer,
            reactor,
            events,
            session,
            transport: guarded,
            client,
            authenticator,
        })
    }

    /// Like [`new`](Self::new), opening the store named in `config`
    pub async fn open(
        config: HostwatchConfig,
        health_check: Arc<dyn HealthCheck>,
        connectivity: Arc<dyn ConnectivitySource>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let store = store::open(&config.store).await?;
        Self::new(config, store, health_check, connectivity, transport)
    }

    /// Pick up the cached host and, on native, start reacting to network changes
    ///
    /// `on_host_changed` runs for the startup discovery result and for
    /// every later change. Calling `init` again while running is a no-op
    /// for the reactor.
    pub async fn init<F>(&self, on_host_changed: F) -> Arc<ServiceConfig>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let config = self.config_store.refresh().await;
        if self.config.platform.is_native() {
            self.reactor.start(on_host_changed);
        } else {
            info!("Web platform, network reactor not started");
        }
        config
    }

    /// Stop reacting to network changes; safe to call repeatedly
    pub fn dispose(&self) {
        self.reactor.stop();
    }

    /// Probe `address` and adopt it as the backend host on success
    pub async fn update_host(&self, address: &str) -> bool {
        if !self.discoverer.adopt(address).await {
            return false;
        }
        let address = address.trim();
        self.reactor.remember(address);
        info!("Backend host set to {}", address);
        self.events.emit(Signal::BackendHostChanged {
            address: address.to_string(),
        });
        true
    }

    /// Host last reported by the reactor, else the persisted one
    pub async fn last_known_host(&self) -> Option<String> {
        match self.reactor.last_host() {
            Some(host) => Some(host),
            None => self.registry.get_cached().await,
        }
    }

    /// Ask listeners (screens) to reload their data
    pub fn request_refresh(&self) {
        self.events.emit(Signal::RefreshRequested);
    }

    pub fn config(&self) -> &HostwatchConfig {
        &self.config
    }

    pub fn service_config(&self) -> Arc<ServiceConfig> {
        self.config_store.get()
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config_store
    }

    pub fn discoverer(&self) -> &Arc<HostDiscoverer> {
        &self.discoverer
    }

    pub fn reactor(&self) -> &NetworkReactor {
        &self.reactor
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The guarded transport
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }
}

impl std::fmt::Debug for Hostwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hostwatch")
            .field("platform", &self.config.platform)
            .field("registry", &self.registry)
            .field("reactor", &self.reactor)
            .finish_non_exhaustive()
    }
}
