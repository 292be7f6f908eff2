//! Vendor server API configuration.
//!
//! Provides:
//! - Region to endpoint mapping
//! - Builder-style overrides
//! - Environment loading

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use url::Url;

pub const SECRET_KEY_VAR: &str = "FINGERPRINT_SECRET_KEY";
pub const REGION_VAR: &str = "FINGERPRINT_REGION";
pub const BASE_URL_VAR: &str = "FINGERPRINT_API_BASE_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HISTORY_LIMIT: u32 = 10;
const MASKED_PREFIX_CHARS: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FINGERPRINT_SECRET_KEY is not set")]
    MissingSecretKey,
    #[error("secret key contains characters not allowed in a header")]
    InvalidSecretKey,
    #[error("unknown region `{0}` (expected us, eu or ap)")]
    UnknownRegion(String),
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Vendor API deployment region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRegion {
    #[default]
    Us,
    Eu,
    Ap,
}

impl ServerRegion {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ServerRegion::Us => "https://api.fpjs.io",
            ServerRegion::Eu => "https://eu.api.fpjs.io",
            ServerRegion::Ap => "https://ap.api.fpjs.io",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRegion::Us => "us",
            ServerRegion::Eu => "eu",
            ServerRegion::Ap => "ap",
        }
    }
}

impl FromStr for ServerRegion {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "us" | "global" => Ok(ServerRegion::Us),
            "eu" => Ok(ServerRegion::Eu),
            "ap" | "asia" => Ok(ServerRegion::Ap),
            _ => Err(ConfigError::UnknownRegion(value.to_string())),
        }
    }
}

impl std::fmt::Display for ServerRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for [`crate::server::FingerprintServerClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct ServerApiConfig {
    pub secret_key: String,
    pub region: ServerRegion,
    /// Overrides the regional endpoint when set.
    pub base_url: Option<Url>,
    pub timeout: Duration,
    /// Page size used for visitor history when the caller gives none.
    pub history_limit: u32,
}

impl Default for ServerApiConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            region: ServerRegion::default(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl std::fmt::Debug for ServerApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerApiConfig")
            .field("secret_key", &self.masked_secret())
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl ServerApiConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    pub fn with_region(mut self, region: ServerRegion) -> Self {
        self.region = region;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = Some(parse_base_url(base_url)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Load from `FINGERPRINT_SECRET_KEY`, `FINGERPRINT_REGION` and
    /// `FINGERPRINT_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let secret_key = present(SECRET_KEY_VAR).ok_or(ConfigError::MissingSecretKey)?;
        let mut config = Self::new(secret_key.trim());

        if let Some(region) = present(REGION_VAR) {
            config = config.with_region(region.parse()?);
        }
        if let Some(base_url) = present(BASE_URL_VAR) {
            config = config.with_base_url(&base_url)?;
        }

        log::debug!(
            "server api config loaded: region={}, endpoint={}",
            config.region,
            config.endpoint_str()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }
        Ok(())
    }

    /// Effective API root: the override if set, else the regional endpoint.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => parse_base_url(self.region.endpoint()),
        }
    }

    fn endpoint_str(&self) -> &str {
        self.base_url
            .as_ref()
            .map_or(self.region.endpoint(), Url::as_str)
    }

    /// Secret shortened for display: first eight characters and an ellipsis.
    pub fn masked_secret(&self) -> String {
        mask_secret(&self.secret_key)
    }
}

pub(crate) fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "未配置".to_string();
    }
    let prefix: String = secret.chars().take(MASKED_PREFIX_CHARS).collect();
    format!("{prefix}...")
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("url cannot be used as a base".to_string()));
    }
    Ok(url)
}
