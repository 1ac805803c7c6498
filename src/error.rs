//! Error types for stream-feeds
//!
//! Every fallible operation in the crate returns `FeedError`. Errors reported
//! by the remote service are decoded into `ApiError` and carried by
//! `FeedError::Api`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Client-wide error type
#[derive(Debug, Error)]
pub enum FeedError {
    /// Bad feed slug, user id, foreign id or activity payload.
    /// Raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or inconsistent client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP verb with no scope action
    #[error("Unsupported HTTP verb: {0}")]
    UnsupportedVerb(String),

    /// Feed authentication could not derive an action from the request verb
    #[error("missing action")]
    MissingAction,

    /// No route pattern matched the logical request path
    #[error("invalid request path: {0}")]
    NoMatchingRoute(String),

    /// The matched authentication method has no registered authenticator
    #[error("missing authentication method")]
    MissingAuthenticationMethod,

    /// HMAC or JWT signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Base URL or request path could not be turned into a URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network or connection failure
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response from the feed service
    #[error("{0}")]
    Api(ApiError),
}

impl From<config::ConfigError> for FeedError {
    fn from(err: config::ConfigError) -> Self {
        FeedError::Config(err.to_string())
    }
}

impl From<ApiError> for FeedError {
    fn from(err: ApiError) -> Self {
        FeedError::Api(err)
    }
}

/// Result type alias using FeedError
pub type Result<T> = std::result::Result<T, FeedError>;

/// Error envelope returned by the feed service
///
/// ```text
/// {"code": 5, "detail": "...", "duration": "36ms", "exception": "...", "status_code": 400}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiError {
    pub code: i64,
    pub status_code: u16,
    /// Server-side processing time
    pub duration: Duration,
    pub detail: String,
    pub exception: String,
    /// Per-field validation messages, `None` when the service sent none
    pub exception_fields: Option<HashMap<String, Vec<String>>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.exception, self.duration)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

#[derive(Deserialize)]
struct RawApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    status_code: u16,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    exception: String,
    #[serde(default)]
    exception_fields: Option<HashMap<String, serde_json::Value>>,
}

impl<'de> Deserialize<'de> for ApiError {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawApiError::deserialize(deserializer)?;
        let duration = parse_duration(&raw.duration).map_err(serde::de::Error::custom)?;

        Ok(ApiError {
            code: raw.code,
            status_code: raw.status_code,
            duration,
            detail: raw.detail,
            exception: raw.exception,
            exception_fields: raw.exception_fields.and_then(exception_fields),
        })
    }
}

/// Keep only string entries of list-valued fields.
fn exception_fields(
    data: HashMap<String, serde_json::Value>,
) -> Option<HashMap<String, Vec<String>>> {
    if data.is_empty() {
        return None;
    }

    let fields = data
        .into_iter()
        .filter_map(|(key, value)| {
            let list = value.as_array()?;
            let messages = list
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            Some((key, messages))
        })
        .collect();

    Some(fields)
}

/// Parse a duration string as reported by the service
///
/// # Format
/// A sequence of decimal numbers with unit suffixes, e.g. `36ms`, `1.5s`,
/// `1h2m`. Units: `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`. A bare `0` is
/// accepted.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    if input.is_empty() {
        return Err("invalid duration \"\"".to_string());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let invalid = || format!("invalid duration {:?}", input);
    let mut rest = input;
    let mut total_nanos: f64 = 0.0;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_nanos += value * scale;
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
