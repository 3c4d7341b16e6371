//! API client
//!
//! Thin request builder over the guarded transport. Every call resolves
//! its URL against the current [`ServiceConfig`](crate::config_store::ServiceConfig),
//! so a host change takes effect on the next request.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::config_store::ConfigStore;
use crate::error::{Error, Result};
use crate::traits::{ApiRequest, ApiResponse, Method, Transport};

/// Authenticated access to the primary API
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ConfigStore>,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl ApiClient {
    /// `transport` should be the guarded one
    pub fn new(config: Arc<ConfigStore>, transport: Arc<dyn Transport>, session: Session) -> Self {
        Self {
            config,
            transport,
            session,
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::Get, path, None).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<ApiResponse> {
        self.request(Method::Post, path, Some(body)).await
    }

    /// GET `path` and decode a 2xx JSON body
    ///
    /// Non-2xx statuses become errors carrying the server's `detail`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        if response.is_unauthorized() {
            return Err(Error::auth(
                response.detail().unwrap_or_else(|| "Unauthorized".to_string()),
            ));
        }
        if !response.is_success() {
            return Err(Error::http(
                response
                    .detail()
                    .unwrap_or_else(|| format!("HTTP error! status: {}", response.status)),
            ));
        }
        response.json()
    }

    /// Send one request
    ///
    /// GET requests are retried when no response was received at all;
    /// an HTTP status, even 5xx, is returned as is.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let config = self.config.get();

        let mut request = ApiRequest::new(method, config.url(path)).with_timeout(config.timeout);
        if let Some(body) = body {
            request = request
                .with_header("Content-Type", "application/json")
                .with_body(body);
        }
        if let Some(token) = self.session.token().await {
            request = request.with_header("Authorization", format!("Bearer {token}"));
        }

        let attempts = if method == Method::Get {
            config.retry_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.transport.send(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < attempts => {
                    warn!(
                        "{} {} failed (attempt {}/{}): {}",
                        method, request.url, attempt, attempts, e
                    );
                    tokio::time::sleep(config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{} {} giving up after {} attempt(s)", method, request.url, attempt);
                    return Err(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, Platform};
    use crate::registry::HostRegistry;
    use crate::store::MemoryStore;
    use crate::traits::KeyValueStore;
    use crate::traits::kv_store::ACCESS_TOKEN_KEY;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails the first `failures` sends, then answers 200
    struct FlakyTransport {
        failures: Mutex<usize>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl FlakyTransport {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures: Mutex::new(failures),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<ApiRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.seen.lock().unwrap().push(request);
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::http("connection refused"));
            }
            Ok(ApiResponse::json_body(200, "OK", &serde_json::json!({"ok": true})))
        }
    }

    fn client(transport: Arc<FlakyTransport>, store: MemoryStore) -> ApiClient {
        let store: Arc<dyn KeyValueStore> = Arc::new(store);
        let registry = Arc::new(HostRegistry::new(&["10.0.2.2".to_string()], store.clone()));
        let config = Arc::new(ConfigStore::new(ApiConfig::default(), Platform::Native, registry));
        ApiClient::new(config, transport, Session::new(store))
    }

    #[tokio::test(start_paused = true)]
    async fn get_retries_transport_errors() {
        let transport = FlakyTransport::new(2);
        let client = client(transport.clone(), MemoryStore::new());

        let response = client.get("/api/v1/orders").await.unwrap();
        assert_eq!(response.status, 200);

        let seen = transport.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].url, "http://10.0.2.2:8000/api/v1/orders");
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(30)));
        assert!(!seen[0].headers.contains_key("Authorization"));
    }

    #[tokio::test(start_paused = true)]
    async fn get_gives_up_after_budget() {
        let transport = FlakyTransport::new(5);
        let client = client(transport.clone(), MemoryStore::new());

        assert!(client.get("/api/v1/orders").await.is_err());
        assert_eq!(transport.seen().len(), 3);
    }

    #[tokio::test]
    async fn post_is_sent_once_with_bearer() {
        let transport = FlakyTransport::new(1);
        let store = MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "abc")]);
        let client = client(transport.clone(), store);

        assert!(
            client
                .post("/api/v1/orders", serde_json::json!({"table": 4}))
                .await
                .is_err()
        );

        let seen = transport.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].headers["Authorization"], "Bearer abc");
        assert_eq!(seen[0].body, Some(serde_json::json!({"table": 4})));
    }

    #[tokio::test]
    async fn get_json_decodes_body() {
        let client = client(FlakyTransport::new(0), MemoryStore::new());
        let value: serde_json::Value = client.get_json("/api/v1/status").await.unwrap();
        assert_eq!(value["ok"], true);
    }
}
