//! Derived service configuration
//!
//! [`ConfigStore`] owns the [`ServiceConfig`] every request is built from.
//! A refresh builds a whole new value and swaps it in, so readers see the
//! old config or the new one, never a mix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ApiConfig, Platform};
use crate::registry::HostRegistry;

/// Resolved origins plus the fixed request policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Primary API base URL, no trailing slash
    pub base_url: String,
    /// Secondary (model) service base URL
    pub secondary_url: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl ServiceConfig {
    /// Absolute URL for an API path such as `/api/v1/orders`
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Primary base URL for `host`
///
/// Priority: explicit override, then `http://{host}:{primary_port}` on
/// native, then the public origin.
pub fn primary_url(api: &ApiConfig, platform: Platform, host: &str) -> String {
    if let Some(url) = &api.api_url_override {
        return url.trim_end_matches('/').to_string();
    }
    if platform.is_native() {
        return format!("http://{}:{}", host, api.primary_port);
    }
    api.public_origin.trim_end_matches('/').to_string()
}

/// Secondary service URL derived from the primary one
pub fn secondary_url(api: &ApiConfig, platform: Platform, primary: &str) -> String {
    if let Some(url) = &api.secondary_url_override {
        return url.trim_end_matches('/').to_string();
    }
    if platform.is_native() {
        return primary.replace(
            &format!(":{}", api.primary_port),
            &format!(":{}", api.secondary_port),
        );
    }
    api.public_origin.trim_end_matches('/').to_string()
}

/// Process-wide derived configuration
pub struct ConfigStore {
    api: ApiConfig,
    platform: Platform,
    registry: Arc<HostRegistry>,
    current: RwLock<Arc<ServiceConfig>>,
    announced: AtomicBool,
}

impl ConfigStore {
    /// Build the initial config from the highest-priority candidate
    ///
    /// Call [`refresh`](Self::refresh) to pick up a cached host.
    pub fn new(api: ApiConfig, platform: Platform, registry: Arc<HostRegistry>) -> Self {
        let host = registry.primary_candidate().unwrap_or_default().to_string();
        let initial = Self::build(&api, platform, &host);

        let store = Self {
            api,
            platform,
            registry,
            current: RwLock::new(Arc::new(initial)),
            announced: AtomicBool::new(false),
        };
        store.announce();
        store
    }

    /// Current config snapshot
    pub fn get(&self) -> Arc<ServiceConfig> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild from the cached host and swap it in
    pub async fn refresh(&self) -> Arc<ServiceConfig> {
        let host = match self.registry.get_cached().await {
            Some(host) => host,
            None => self
                .registry
                .primary_candidate()
                .unwrap_or_default()
                .to_string(),
        };

        let next = Arc::new(Self::build(&self.api, self.platform, &host));
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next.clone();

        debug!("Service config refreshed: base_url={}", next.base_url);
        next
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn build(api: &ApiConfig, platform: Platform, host: &str) -> ServiceConfig {
        let base_url = primary_url(api, platform, host);
        let secondary_url = secondary_url(api, platform, &base_url);
        ServiceConfig {
            base_url,
            secondary_url,
            timeout: Duration::from_millis(api.request_timeout_ms),
            retry_attempts: api.retry_attempts,
            retry_delay: Duration::from_millis(api.retry_delay_ms),
        }
    }

    fn announce(&self) {
        if self.announced.swap(true, Ordering::SeqCst) {
            return;
        }
        let config = self.get();
        info!(
            platform = ?self.platform,
            base_url = %config.base_url,
            secondary_url = %config.secondary_url,
            "API config resolved"
        );
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("platform", &self.platform)
            .field("current", &self.get())
            .finish_non_exhaustive()
    }
}
