//! Configuration types for hostwatch
//!
//! Everything here is static for the life of the process. Changing the
//! candidate list or the API origins means redeploying configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the primary API base URL
pub const ENV_API_URL: &str = "HOSTWATCH_API_URL";
/// Environment variable overriding the secondary service base URL
pub const ENV_SECONDARY_URL: &str = "HOSTWATCH_SECONDARY_URL";
/// Environment variable selecting the platform (`native` or `web`)
pub const ENV_PLATFORM: &str = "HOSTWATCH_PLATFORM";
/// Environment variable replacing the candidate list (comma separated)
pub const ENV_CANDIDATES: &str = "HOSTWATCH_CANDIDATES";
/// Environment variable selecting the probe target (`candidate` or a URL)
pub const ENV_PROBE_TARGET: &str = "HOSTWATCH_PROBE_TARGET";

/// Fixed public origin used on the web and as the health relay
pub const DEFAULT_PUBLIC_ORIGIN: &str = "https://srv1265534.hstgr.cloud";

/// Candidate addresses in priority order (index 0 first)
const DEFAULT_CANDIDATES: &[&str] = &[
    "192.168.8.184",
    "192.168.126.1",
    "192.168.245.1",
    "192.168.1.3",
    "192.168.1.100",
    "192.168.0.100",
    "192.168.1.1",
    "192.168.0.1",
    "192.168.43.1",
    "192.168.137.1",
    "10.0.2.2",
];

/// Main hostwatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostwatchConfig {
    /// Candidate backend addresses, highest priority first
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Which shell the client runs in
    #[serde(default)]
    pub platform: Platform,

    /// Reachability probe settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// API origin resolution and request policy
    #[serde(default)]
    pub api: ApiConfig,

    /// Persistent key-value store
    #[serde(default)]
    pub store: StoreConfig,
}

impl HostwatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            candidates: default_candidates(),
            platform: Platform::default(),
            probe: ProbeConfig::default(),
            api: ApiConfig::default(),
            store: StoreConfig::default(),
        }
    }

    /// Defaults overlaid with `HOSTWATCH_*` environment variables
    pub fn from_env() -> Result<Self, crate::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::new();

        if let Some(url) = get(ENV_API_URL) {
            config.api.api_url_override = Some(url);
        }
        if let Some(url) = get(ENV_SECONDARY_URL) {
            config.api.secondary_url_override = Some(url);
        }
        if let Some(platform) = get(ENV_PLATFORM) {
            config.platform = match platform.to_lowercase().as_str() {
                "native" => Platform::Native,
                "web" => Platform::Web,
                other => {
                    return Err(crate::Error::config(format!(
                        "{ENV_PLATFORM} '{other}' is not valid. Valid values: native, web"
                    )));
                }
            };
        }
        if let Some(list) = get(ENV_CANDIDATES) {
            config.candidates = list.split(',').map(str::to_string).collect();
        }
        if let Some(target) = get(ENV_PROBE_TARGET) {
            config.probe.target = if target.eq_ignore_ascii_case("candidate") {
                ProbeTarget::candidate()
            } else {
                ProbeTarget::FixedOrigin { url: target }
            };
        }

        config.candidates = normalize_candidates(&config.candidates);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if normalize_candidates(&self.candidates).is_empty() {
            return Err(crate::Error::config("No candidate addresses configured"));
        }

        self.probe.validate()?;
        self.api.validate()?;

        if let StoreConfig::File { path } = &self.store
            && path.trim().is_empty()
        {
            return Err(crate::Error::config("File store path cannot be empty"));
        }

        Ok(())
    }
}

impl Default for HostwatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim, drop empties and de-duplicate, keeping the first occurrence
pub fn normalize_candidates(candidates: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() || out.iter().any(|c| c == candidate) {
            continue;
        }
        out.push(candidate.to_string());
    }
    out
}

/// Shell the client is running in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Native mobile shell; talks to a LAN backend
    Native,
    /// Browser; talks to the public origin
    #[default]
    Web,
}

impl Platform {
    pub fn is_native(&self) -> bool {
        matches!(self, Platform::Native)
    }
}

/// Reachability probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Attempts per address before it counts as unreachable
    #[serde(default = "default_probe_attempts")]
    pub attempts: u32,

    /// Hard deadline for one attempt (in milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,

    /// Wait between failed attempts (in milliseconds)
    #[serde(default = "default_probe_backoff_ms")]
    pub backoff_ms: u64,

    /// What the health check actually requests
    #[serde(default)]
    pub target: ProbeTarget,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.attempts == 0 {
            return Err(crate::Error::config("Probe attempts must be > 0"));
        }
        if self.timeout_ms == 0 {
            return Err(crate::Error::config("Probe timeout must be > 0"));
        }
        self.target.validate()
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: default_probe_attempts(),
            timeout_ms: default_probe_timeout_ms(),
            backoff_ms: default_probe_backoff_ms(),
            target: ProbeTarget::default(),
        }
    }
}

/// Health-check URL strategy
///
/// `FixedOrigin` requests the same relay URL no matter which candidate is
/// being tested, so a success only proves the relay is up. `Candidate`
/// requests the candidate's own address and port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeTarget {
    /// Probe one fixed health URL for every candidate
    FixedOrigin {
        /// Full health-check URL
        url: String,
    },

    /// Probe `{scheme}://{candidate}:{port}{path}`
    Candidate {
        #[serde(default = "default_candidate_scheme")]
        scheme: String,
        #[serde(default = "default_primary_port")]
        port: u16,
        #[serde(default = "default_health_path")]
        path: String,
    },
}

impl ProbeTarget {
    /// Probe the candidate's own backend port
    pub fn candidate() -> Self {
        ProbeTarget::Candidate {
            scheme: default_candidate_scheme(),
            port: default_primary_port(),
            path: default_health_path(),
        }
    }

    /// Health-check URL to request when testing `address`
    pub fn url_for(&self, address: &str) -> String {
        match self {
            ProbeTarget::FixedOrigin { url } => url.clone(),
            ProbeTarget::Candidate { scheme, port, path } => {
                format!("{scheme}://{address}:{port}{path}")
            }
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProbeTarget::FixedOrigin { url } => {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Probe URL must use HTTP or HTTPS scheme. Got: {url}"
                    )));
                }
                Ok(())
            }
            ProbeTarget::Candidate { scheme, port, .. } => {
                if scheme != "http" && scheme != "https" {
                    return Err(crate::Error::config(format!(
                        "Probe scheme must be http or https. Got: {scheme}"
                    )));
                }
                if *port == 0 {
                    return Err(crate::Error::config("Probe port must be > 0"));
                }
                Ok(())
            }
        }
    }
}

impl Default for ProbeTarget {
    fn default() -> Self {
        ProbeTarget::FixedOrigin {
            url: format!("{DEFAULT_PUBLIC_ORIGIN}/health/"),
        }
    }
}

/// API origin resolution and request policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Explicit primary base URL; wins over everything else
    #[serde(default)]
    pub api_url_override: Option<String>,

    /// Explicit secondary service base URL
    #[serde(default)]
    pub secondary_url_override: Option<String>,

    /// Origin used on the web
    #[serde(default = "default_public_origin")]
    pub public_origin: String,

    /// Primary API port on a LAN host
    #[serde(default = "default_primary_port")]
    pub primary_port: u16,

    /// Secondary service port on a LAN host
    #[serde(default = "default_secondary_port")]
    pub secondary_port: u16,

    /// Per-request timeout (in milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Attempts for retryable requests
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between request retries (in milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl ApiConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.public_origin.trim().is_empty() {
            return Err(crate::Error::config("Public origin cannot be empty"));
        }
        if self.primary_port == 0 || self.secondary_port == 0 {
            return Err(crate::Error::config("API ports must be > 0"));
        }
        if self.request_timeout_ms == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url_override: None,
            secondary_url_override: None,
            public_origin: default_public_origin(),
            primary_port: default_primary_port(),
            secondary_port: default_secondary_port(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Key-value store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON file on disk
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

fn default_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect()
}

fn default_probe_attempts() -> u32 {
    2
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_probe_backoff_ms() -> u64 {
    1_000
}

fn default_candidate_scheme() -> String {
    "http".to_string()
}

fn default_health_path() -> String {
    "/health/".to_string()
}

fn default_public_origin() -> String {
    DEFAULT_PUBLIC_ORIGIN.to_string()
}

fn default_primary_port() -> u16 {
    8000
}

fn default_secondary_port() -> u16 {
    8001
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}
