//! Vendor server API access.
//!
//! The HTTP transport sits behind [`SignalHttpClient`] so lookups can be
//! exercised without a network. [`FingerprintServerClient`] builds vendor
//! requests on top of it and folds results into a
//! [`ServerSignals`](crate::signals::ServerSignals) container.

mod client;
mod reqwest_client;

pub use client::{
    FingerprintServerClient, FingerprintServerClientBuilder, HealthReport, HealthStatus,
    HistoryQuery,
};
pub use reqwest_client::ReqwestSignalClient;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ConfigError;

/// Transport used to reach the vendor API.
#[async_trait]
pub trait SignalHttpClient: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<SignalHttpResponse, SignalHttpClientError>;
}

/// Minimal response representation returned by the transport.
#[derive(Debug, Clone)]
pub struct SignalHttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl SignalHttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum SignalHttpClientError {
    #[error("http transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ServerApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] SignalHttpClientError),
    #[error("Fingerprint Server API Error: {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("invalid {0}")]
    InvalidId(&'static str),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid request url: {0}")]
    Url(String),
}

impl ServerApiError {
    /// Status a proxy endpoint should answer with for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            ServerApiError::Api { .. } | ServerApiError::InvalidId(_) => 400,
            ServerApiError::NotFound(_) => 404,
            _ => 500,
        }
    }
}
