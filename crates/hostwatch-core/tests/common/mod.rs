//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call so tests can assert on exact probe order
//! and on whether a request reached the network at all.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration as ChronoDuration, Utc};
use hostwatch_core::config::{HostwatchConfig, Platform};
use hostwatch_core::error::{Error, Result};
use hostwatch_core::traits::{
    ApiRequest, ApiResponse, ConnectionKind, ConnectivityStatus, HealthCheck, KeyValueStore,
    Transport,
};
use hostwatch_core::{ChannelConnectivity, Hostwatch, MemoryStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// How a scripted address answers a health check
#[derive(Clone)]
pub enum Reply {
    Up,
    Down,
    /// Never answers; the probe deadline cancels it
    Hang,
    /// Waits for the notify, then answers up
    Gated(Arc<Notify>),
}

/// A HealthCheck answering from a per-address script
///
/// Unscripted addresses are down.
pub struct ScriptedHealthCheck {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHealthCheck {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set(&self, address: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(address.to_string(), reply);
    }

    /// Every address checked, in order, one entry per attempt
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HealthCheck for ScriptedHealthCheck {
    async fn check(&self, address: &str) -> Result<()> {
        self.calls.lock().unwrap().push(address.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or(Reply::Down);

        match reply {
            Reply::Up => Ok(()),
            Reply::Down => Err(Error::probe(format!("{address} refused connection"))),
            Reply::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Reply::Gated(gate) => {
                gate.notified().await;
                Ok(())
            }
        }
    }
}

type Responder = dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync;

/// A Transport answering from a closure and recording every request
pub struct RecordingTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl RecordingTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers every request with `200 {}`
    pub fn ok() -> Arc<Self> {
        Self::new(|_| Ok(ApiResponse::json_body(200, "OK", &serde_json::json!({}))))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}

/// Unsigned bearer token expiring `seconds` from now (negative: already expired)
pub fn token_expiring_in(seconds: i64) -> String {
    let exp = (Utc::now() + ChronoDuration::seconds(seconds)).timestamp();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({"sub": "alice", "exp": exp}).to_string());
    format!("{header}.{payload}.sig")
}

pub fn online() -> ConnectivityStatus {
    ConnectivityStatus::connected(ConnectionKind::Wifi)
}

pub fn config_with(candidates: &[&str], platform: Platform) -> HostwatchConfig {
    HostwatchConfig {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
        platform,
        ..HostwatchConfig::new()
    }
}

/// Everything a contract test pokes at
pub struct Rig {
    pub hostwatch: Hostwatch,
    pub store: MemoryStore,
    pub health: Arc<ScriptedHealthCheck>,
    pub connectivity: Arc<ChannelConnectivity>,
    pub transport: Arc<RecordingTransport>,
}

impl Rig {
    pub fn native(candidates: &[&str], health: Arc<ScriptedHealthCheck>) -> Self {
        Self::build(
            config_with(candidates, Platform::Native),
            MemoryStore::new(),
            health,
            RecordingTransport::ok(),
        )
    }

    pub fn build(
        config: HostwatchConfig,
        store: MemoryStore,
        health: Arc<ScriptedHealthCheck>,
        transport: Arc<RecordingTransport>,
    ) -> Self {
        let connectivity = Arc::new(ChannelConnectivity::new(online()));
        let hostwatch = Hostwatch::new(
            config,
            Arc::new(store.clone()),
            health.clone(),
            connectivity.clone(),
            transport.clone(),
        )
        .expect("valid config");

        Self {
            hostwatch,
            store,
            health,
            connectivity,
            transport,
        }
    }

    pub async fn persisted_host(&self) -> Option<String> {
        self.store.get("backend_ip").await.unwrap()
    }
}

/// Poll `condition` until it holds or a generous deadline passes
///
/// Works under a paused clock: each sleep lets the runtime advance.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}
