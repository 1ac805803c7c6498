//! Configuration management
//!
//! Loads client configuration from:
//! 1. Default values
//! 2. Configuration file (config/stream.toml, optional)
//! 3. Environment variables (`STREAM_API_KEY`, `STREAM_API_SECRET`,
//!    `STREAM_TOKEN`, `STREAM_REGION`, ...)

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::{FeedError, Result};

pub const DEFAULT_VERSION: &str = "v1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

static REGION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

/// Credentials and endpoint selection for a `Client`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Public API key, sent with every request
    #[serde(default)]
    pub api_key: String,
    /// API secret; ignored when `token` is set
    pub api_secret: Option<String>,
    /// Pre-issued token used in place of the secret
    pub token: Option<String>,
    pub app_id: Option<String>,
    /// Region name, `localhost`, or a full `http(s)://` origin
    #[serde(default, alias = "region")]
    pub location: Option<String>,
    /// API version path segment (default: "v1.0")
    #[serde(default)]
    pub version: String,
    /// Request timeout in seconds (default: 3)
    #[serde(default)]
    pub timeout_secs: u64,
}

/// The secret that drives signing
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    ApiSecret(String),
    Token(String),
}

impl Secret {
    pub fn expose(&self) -> &str {
        match self {
            Secret::ApiSecret(value) | Secret::Token(value) => value,
        }
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::ApiSecret(_) => f.write_str("ApiSecret(<redacted>)"),
            Secret::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: Some(api_secret.into()),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/stream.toml (if exists)
    /// 3. Environment variables (STREAM_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("version", DEFAULT_VERSION)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .add_source(File::with_name("config/stream").required(false))
            .add_source(Environment::with_prefix("STREAM").prefix_separator("_"))
            .build()
            .map_err(|e| FeedError::Config(e.to_string()))?;

        let client_config: Self = config
            .try_deserialize()
            .map_err(|e| FeedError::Config(e.to_string()))?;
        client_config.validate()?;
        Ok(client_config)
    }

    /// Check that the client can sign requests
    ///
    /// # Errors
    /// `FeedError::Config` if the API key is empty, or if neither a
    /// secret nor a token is set.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(FeedError::Config("Required API Key was not set".to_string()));
        }
        self.secret()?;
        Ok(())
    }

    /// Token if present, otherwise the API secret
    pub fn secret(&self) -> Result<Secret> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        if let Some(token) = non_empty(&self.token) {
            return Ok(Secret::Token(token));
        }
        if let Some(secret) = non_empty(&self.api_secret) {
            return Ok(Secret::ApiSecret(secret));
        }
        Err(FeedError::Config(
            "API Secret or Token was not set, one or the other is required".to_string(),
        ))
    }

    pub fn version(&self) -> &str {
        if self.version.is_empty() {
            DEFAULT_VERSION
        } else {
            &self.version
        }
    }

    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    fn location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
    }

    /// Value of the `location` query parameter
    pub fn location_param(&self) -> &str {
        match self.location() {
            None | Some("localhost") => "unspecified",
            Some(location) => location,
        }
    }

    /// API base URL, always ending in `/api/<version>/`
    ///
    /// # Examples
    /// - no location → `https://api.getstream.io/api/v1.0/`
    /// - `localhost` → `http://localhost:8000/api/v1.0/`
    /// - `us-east` → `https://us-east-api.getstream.io/api/v1.0/`
    /// - `https://example.com:1234/` → `https://example.com:1234/api/v1.0/`
    pub fn base_url(&self) -> Result<url::Url> {
        let version = self.version();

        let base = match self.location() {
            None => format!("https://api.getstream.io/api/{}/", version),
            Some("localhost") => format!("http://localhost:8000/api/{}/", version),
            Some(origin) if origin.starts_with("http://") || origin.starts_with("https://") => {
                format!("{}/api/{}/", origin.trim_end_matches('/'), version)
            }
            Some(region) => {
                if !REGION_RE.is_match(region) {
                    return Err(FeedError::Config(format!("invalid location {:?}", region)));
                }
                let scheme = if region == "qa" { "http" } else { "https" };
                format!("{}://{}-api.getstream.io/api/{}/", scheme, region, version)
            }
        };

        Ok(url::Url::parse(&base)?)
    }
}
