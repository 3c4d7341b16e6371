//! Request guard
//!
//! Wraps a [`Transport`] so every outgoing API call is checked against the
//! stored token before it leaves the process:
//!
//! ```text
//! send(request)
//!    │
//!    ├─ guarded path (/api/v1/, not login, not health) with an expired token
//!    │      └─► synthesized 401, AuthExpired published after this call returns
//!    │
//!    └─ anything else ─► inner transport
//!                           └─ 401 from the server (non-login) ─► AuthExpired
//! ```
//!
//! Requests are forwarded untouched. Tokens that cannot be decoded are
//! not judged locally; the server decides.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::events::{EventBus, Signal};
use crate::traits::{ApiRequest, ApiResponse, Transport};

use super::session::Session;
use super::token::TokenExpiry;

const GUARDED_PREFIX: &str = "/api/v1/";
const LOGIN_PATH: &str = "/auth/login";
const HEALTH_PATH: &str = "/health";

/// Detail carried by the locally synthesized 401
pub const EXPIRED_DETAIL: &str = "Signature has expired";

/// Transport decorator enforcing local token expiry
pub struct RequestGuard {
    inner: Arc<dyn Transport>,
    session: Session,
    events: EventBus,
}

impl RequestGuard {
    pub fn new(inner: Arc<dyn Transport>, session: Session, events: EventBus) -> Self {
        Self {
            inner,
            session,
            events,
        }
    }

    /// Whether the local expiry check applies to `url`
    pub fn is_guarded(url: &str) -> bool {
        url.contains(GUARDED_PREFIX) && !url.contains(LOGIN_PATH) && !url.contains(HEALTH_PATH)
    }

    fn expired_response() -> ApiResponse {
        ApiResponse::json_body(
            401,
            "Unauthorized",
            &serde_json::json!({ "detail": EXPIRED_DETAIL }),
        )
    }
}

#[async_trait]
impl Transport for RequestGuard {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        if Self::is_guarded(&request.url)
            && let Some(token) = self.session.token().await
            && TokenExpiry::inspect(&token, Utc::now()).is_expired()
        {
            warn!("Token expired, short-circuiting {} {}", request.method, request.url);
            // subscribers run after the caller has seen the 401
            self.events.emit_deferred(Signal::AuthExpired);
            return Ok(Self::expired_response());
        }

        let url = request.url.clone();
        let response = self.inner.send(request).await?;

        if response.is_unauthorized() && !url.contains(LOGIN_PATH) {
            debug!("Server rejected token for {}", url);
            self.events.emit(Signal::AuthExpired);
        }

        Ok(response)
    }
}

impl std::fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_paths() {
        assert!(RequestGuard::is_guarded("http://10.0.2.2:8000/api/v1/orders"));
        assert!(RequestGuard::is_guarded("https://srv.example/api/v1/menu/items?x=1"));
        assert!(!RequestGuard::is_guarded("http://10.0.2.2:8000/api/v1/auth/login"));
        assert!(!RequestGuard::is_guarded("http://10.0.2.2:8000/health/"));
        assert!(!RequestGuard::is_guarded("http://10.0.2.2:8000/api/v1/health"));
        assert!(!RequestGuard::is_guarded("http://10.0.2.2:8001/v1/completions"));
    }

    #[test]
    fn synthesized_response_shape() {
        let response = RequestGuard::expired_response();
        assert_eq!(response.status, 401);
        assert_eq!(response.status_text, "Unauthorized");
        assert_eq!(response.detail().as_deref(), Some(EXPIRED_DETAIL));
        assert_eq!(response.headers["content-type"], "application/json");
    }
}
