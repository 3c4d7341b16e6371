// # Transport Trait
//
// The raw request/response exchange with the backend. `RequestGuard`
// implements this trait over another `Transport`, so application code
// holding a `dyn Transport` is guarded without changing any call site.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// JSON body, if any
    pub body: Option<serde_json::Value>,
    /// Deadline for the whole exchange
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response as received (or synthesized locally)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// A JSON response with `content-type: application/json`
    pub fn json_body(status: u16, status_text: &str, value: &serde_json::Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status,
            status_text: status_text.to_string(),
            headers,
            body: value.to_string().into_bytes(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Body as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, crate::Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The `detail` field of a JSON error body, if present
    pub fn detail(&self) -> Option<String> {
        self.json::<serde_json::Value>()
            .ok()?
            .get("detail")?
            .as_str()
            .map(str::to_string)
    }
}

/// Trait for request transports
///
/// `Err` means no HTTP response was obtained (connection refused, DNS
/// failure, timeout). Any HTTP status, including 4xx/5xx, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_extracted_from_json_body() {
        let response = ApiResponse::json_body(
            401,
            "Unauthorized",
            &serde_json::json!({"detail": "Signature has expired"}),
        );
        assert!(response.is_unauthorized());
        assert!(!response.is_success());
        assert_eq!(response.detail().as_deref(), Some("Signature has expired"));
        assert_eq!(
            response.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn detail_is_none_for_plain_text() {
        let response = ApiResponse::new(500, "boom");
        assert_eq!(response.detail(), None);
        assert_eq!(response.text(), "boom");
    }

    #[test]
    fn request_builder() {
        let request = ApiRequest::get("http://10.0.2.2:8000/api/v1/orders")
            .with_header("Authorization", "Bearer abc")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.headers["Authorization"], "Bearer abc");
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
        assert!(request.body.is_none());
    }
}
