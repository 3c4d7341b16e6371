//! Stored session
//!
//! The bearer token and the signed-in user live in the key-value store
//! under `access_token` and `user`. Sign-out removes both.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::KeyValueStore;
use crate::traits::kv_store::{ACCESS_TOKEN_KEY, USER_KEY};

use super::token::TokenExpiry;

/// Profile returned by the login endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<serde_json::Value>,
    /// Fields this crate does not interpret, kept as received
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Best human-readable name
    pub fn display_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.email.as_deref())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Token and profile persisted across restarts
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored bearer token
    ///
    /// Read failures are logged and reported as "no token".
    pub async fn token(&self) -> Option<String> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Failed to read access token: {}", e);
                None
            }
        }
    }

    /// Stored profile; an unreadable entry counts as absent
    pub async fn user(&self) -> Option<UserProfile> {
        let raw = match self.store.get(USER_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read stored user: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored user is not valid JSON: {}", e);
                None
            }
        }
    }

    /// Persist a freshly issued token and its profile
    pub async fn save(&self, token: &str, user: &UserProfile) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token).await?;
        self.store
            .set(USER_KEY, &serde_json::to_string(user)?)
            .await?;
        self.store.flush().await?;
        debug!("Session saved for {}", user.display_name().unwrap_or("unknown user"));
        Ok(())
    }

    /// Sign out: remove the token and the profile
    pub async fn logout(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY).await?;
        self.store.remove(USER_KEY).await?;
        self.store.flush().await?;
        info!("Session cleared");
        Ok(())
    }

    /// Expiry verdict for the stored token; `None` when there is no token
    pub async fn expiry(&self) -> Option<TokenExpiry> {
        let token = self.token().await?;
        Some(TokenExpiry::inspect(&token, Utc::now()))
    }

    /// A token is stored and it is not known to be expired
    ///
    /// Undecodable tokens count as signed out here; the request guard
    /// still lets them through to the server.
    pub async fn is_authenticated(&self) -> bool {
        matches!(
            self.expiry().await,
            Some(TokenExpiry::Valid | TokenExpiry::NoExpiry)
        )
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
