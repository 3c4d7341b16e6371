//! Bearer token inspection
//!
//! Only the payload segment is decoded; the signature is never checked.
//! The result is an optimization hint, the server stays authoritative.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Claims read from the token payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Decode the payload (second) segment of `token`
    pub fn decode(token: &str) -> Result<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| Error::invalid_input("token has no payload segment"))?;

        // accept both URL-safe and standard alphabets, with or without padding
        let normalized: String = payload
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();

        let bytes = URL_SAFE_NO_PAD
            .decode(normalized.as_bytes())
            .map_err(|e| Error::invalid_input(format!("token payload is not base64: {e}")))?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Expiry instant, if the token carries one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let millis = (self.exp? * 1000.0) as i64;
        DateTime::from_timestamp_millis(millis)
    }
}

/// Local verdict on a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    /// Expiry claim strictly in the future
    Valid,
    /// Expiry claim in the past
    Expired,
    /// Decodes fine but carries no expiry claim
    NoExpiry,
    /// Cannot be decoded; only the server can judge it
    Malformed,
}

impl TokenExpiry {
    /// Inspect `token` against `now`
    pub fn inspect(token: &str, now: DateTime<Utc>) -> Self {
        let claims = match TokenClaims::decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Token not locally verifiable: {}", e);
                return TokenExpiry::Malformed;
            }
        };

        match claims.exp {
            None => TokenExpiry::NoExpiry,
            Some(exp) if exp * 1000.0 < now.timestamp_millis() as f64 => TokenExpiry::Expired,
            Some(_) => TokenExpiry::Valid,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TokenExpiry::Expired)
    }
}
