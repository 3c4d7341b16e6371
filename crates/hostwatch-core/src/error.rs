//! Error types for hostwatch
//!
//! Discovery, the network reactor and the request guard never hand these
//! to their callers; they log and degrade. Errors surface only from
//! operations whose caller has to decide what to do (store I/O, login,
//! configuration validation, raw transport calls).

use thiserror::Error;

/// Result type alias for hostwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hostwatch
#[derive(Error, Debug)]
pub enum Error {
    /// A single health-check attempt failed
    #[error("Probe error: {0}")]
    Probe(String),

    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connectivity source errors
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// A request did not complete within its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The backend could not be reached at all
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Authentication errors (rejected credentials, expired session)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an "unreachable" error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error is a credential rejection rather than a
    /// connectivity problem
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_credential_rejections_are_auth_errors() {
        assert!(Error::auth("Incorrect username or password").is_auth());
        assert!(!Error::unreachable("http://10.0.2.2:8000").is_auth());
        assert!(!Error::timeout("health check").is_auth());
    }

    #[test]
    fn foreign_errors_convert() {
        let err: Error = anyhow::anyhow!("plugin bridge closed").into();
        assert_eq!(err.to_string(), "plugin bridge closed");

        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
