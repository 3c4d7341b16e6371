//! Sign-in
//!
//! On native the backend host may have moved since the last request, so a
//! login first re-runs discovery and, if the attempt fails for any reason
//! other than rejected credentials, discovers once more and retries once.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config_store::ConfigStore;
use crate::discovery::HostDiscoverer;
use crate::error::{Error, Result};
use crate::traits::{ApiRequest, Transport};

use super::session::{Session, UserProfile};

const LOGIN_PATH: &str = "/api/v1/auth/login";
const HEALTH_PATH: &str = "/health/";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Body returned by a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: UserProfile,
}

/// Credential exchange against the current backend
pub struct Authenticator {
    config: Arc<ConfigStore>,
    discoverer: Arc<HostDiscoverer>,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl Authenticator {
    pub fn new(
        config: Arc<ConfigStore>,
        discoverer: Arc<HostDiscoverer>,
        transport: Arc<dyn Transport>,
        session: Session,
    ) -> Self {
        Self {
            config,
            discoverer,
            transport,
            session,
        }
    }

    /// Sign in and persist the session
    ///
    /// Rejected credentials surface as [`Error::Authentication`] and are
    /// never retried. On native, any other failure ends in
    /// [`Error::Unreachable`] once the retry is spent.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        if !self.config.platform().is_native() {
            return self.attempt(username, password).await;
        }

        // a run already in flight (reactor, foreground) is awaited, not skipped
        if self.discoverer.resolve().await.is_none() {
            debug!("Discovery found nothing new, keeping current backend");
        }
        self.config.refresh().await;

        let first = match self.attempt(username, password).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => e,
        };
        warn!("Login via {} failed ({}), rediscovering backend", self.config.get().base_url, first);

        if self.discoverer.resolve().await.is_some() {
            match self.attempt(username, password).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!("Login retry failed: {}", e),
            }
        }

        Err(Error::unreachable(format!(
            "cannot reach backend at {}",
            self.config.get().base_url
        )))
    }

    /// Sign out locally
    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }

    async fn attempt(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let config = self.config.get();
        info!("Attempting login via {}", config.base_url);

        let health = ApiRequest::get(config.url(HEALTH_PATH)).with_timeout(HEALTH_TIMEOUT);
        match self.transport.send(health).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                return Err(Error::unreachable(format!(
                    "health check returned {}",
                    response.status
                )));
            }
            Err(e) => return Err(Error::unreachable(format!("health check failed: {e}"))),
        }

        let request = ApiRequest::post(
            config.url(LOGIN_PATH),
            serde_json::json!({ "username": username, "password": password }),
        )
        .with_header("Content-Type", "application/json")
        .with_timeout(LOGIN_TIMEOUT);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let detail = response
                .detail()
                .unwrap_or_else(|| format!("HTTP error! status: {}", response.status));
            return Err(if response.is_unauthorized() {
                Error::auth(detail)
            } else {
                Error::http(detail)
            });
        }

        let body: LoginResponse = response.json()?;
        if let Err(e) = self.session.save(&body.access_token, &body.user).await {
            // the caller still gets the token; only persistence failed
            warn!("Failed to persist session: {}", e);
        }
        info!("Logged in as {}", body.user.display_name().unwrap_or(username));
        Ok(body)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
