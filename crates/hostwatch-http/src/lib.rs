// # HTTP Seams
//
// reqwest implementations of the two network-facing hostwatch traits.
//
// ## HttpHealthCheck
//
// One GET per `check()` call against the URL the configured
// `ProbeTarget` yields for the address. Any 2xx counts as reachable. No
// retries, no timeout of its own: `ConnectionProbe` owns both.
//
// ## ReqwestTransport
//
// The raw `Transport` that `RequestGuard` wraps. Every HTTP status is a
// response; only failures to get one at all are errors.

use hostwatch_core::config::ProbeTarget;
use hostwatch_core::traits::{ApiRequest, ApiResponse, HealthCheck, Method, Transport};
use hostwatch_core::{Error, Result};

use std::collections::BTreeMap;

/// Health check issuing one GET per attempt
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: reqwest::Client,
    target: ProbeTarget,
}

impl HttpHealthCheck {
    pub fn new(target: ProbeTarget) -> Self {
        Self::with_client(reqwest::Client::new(), target)
    }

    /// Share an existing client (connection pool, TLS config)
    pub fn with_client(client: reqwest::Client, target: ProbeTarget) -> Self {
        Self { client, target }
    }

    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }
}

#[async_trait::async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, address: &str) -> Result<()> {
        let url = self.target.url_for(address);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::probe(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::probe(format!("{url} returned status {status}")));
        }

        // the body is informational only
        match response.json::<serde_json::Value>().await {
            Ok(body) => tracing::debug!("{} reachable via {}: {}", address, url, body),
            Err(_) => tracing::debug!("{} reachable via {} (status {})", address, url, status),
        }
        Ok(())
    }
}

/// reqwest-backed request transport
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_send_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("{url}: {e}"))
    } else {
        Error::http(format!("{url}: {e}"))
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        let mut builder = self.client.request(to_reqwest(method), &url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        tracing::trace!("{} {}", method, url);
        let response = builder.send().await.map_err(|e| map_send_error(&url, e))?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(&url, e))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}
