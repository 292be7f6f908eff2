use std::sync::Arc;
use std::time::Duration;

use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{ReqwestSignalClient, ServerApiError, SignalHttpClient, SignalHttpResponse};
use crate::config::{ConfigError, ServerApiConfig, ServerRegion, mask_secret};
use crate::signals::{ServerSignals, SourceError, VisitorHistoryResponse};

const AUTH_HEADER: &str = "auth-api-key";
const LOOKUP_ERROR_CODE: &str = "SERVER_FETCH_ERROR";

/// Parameters for the visitor history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub visitor_id: String,
    pub request_id: Option<String>,
    pub linked_id: Option<String>,
    pub limit: Option<u32>,
    pub before: Option<i64>,
}

impl HistoryQuery {
    pub fn new(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            ..Self::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_linked_id(mut self, linked_id: impl Into<String>) -> Self {
        self.linked_id = Some(linked_id.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Only return visits before this epoch-millisecond timestamp.
    pub fn with_before(mut self, before: i64) -> Self {
        self.before = Some(before);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Partial,
}

/// Connectivity probe result. The secret is always masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    pub server_api_key: String,
    pub region: ServerRegion,
    pub endpoint: String,
    pub server_api_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_api_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    products: Value,
}

/// Client for the vendor's server API.
pub struct FingerprintServerClient {
    http: Arc<dyn SignalHttpClient>,
    config: ServerApiConfig,
    endpoint: Url,
    headers: HeaderMap,
}

impl FingerprintServerClient {
    pub fn new(config: ServerApiConfig) -> Result<Self, ServerApiError> {
        FingerprintServerClientBuilder::new().with_config(config).build()
    }

    /// Client configured from `FINGERPRINT_*` environment variables.
    pub fn from_env() -> Result<Self, ServerApiError> {
        Self::new(ServerApiConfig::from_env()?)
    }

    pub fn builder() -> FingerprintServerClientBuilder {
        FingerprintServerClientBuilder::new()
    }

    pub fn config(&self) -> &ServerApiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `GET /visitors/{visitor_id}`.
    pub async fn visitor_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<VisitorHistoryResponse, ServerApiError> {
        let visitor_id = require_id(&query.visitor_id, "visitor id")?;
        let mut url = self.url(&["visitors", visitor_id])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(request_id) = non_empty(query.request_id.as_deref()) {
                pairs.append_pair("request_id", request_id);
            }
            if let Some(linked_id) = non_empty(query.linked_id.as_deref()) {
                pairs.append_pair("linked_id", linked_id);
            }
            let limit = query.limit.filter(|limit| *limit > 0);
            pairs.append_pair(
                "limit",
                &limit.unwrap_or(self.config.history_limit).to_string(),
            );
            if let Some(before) = query.before.filter(|before| *before > 0) {
                pairs.append_pair("before", &before.to_string());
            }
        }

        Ok(self.send(&url).await?.json()?)
    }

    /// `GET /events/{request_id}`, unwrapped to its `products` member.
    pub async fn visit_details(&self, request_id: &str) -> Result<Value, ServerApiError> {
        let request_id = require_id(request_id, "request id")?;
        let url = self.url(&["events", request_id])?;
        let envelope: EventEnvelope = self.send(&url).await?.json()?;
        Ok(envelope.products)
    }

    /// Fetch history and the current event concurrently.
    ///
    /// Both requests settle independently: a failure of one is logged and the
    /// other's data is kept. The container carries an error only when nothing
    /// could be fetched.
    pub async fn lookup(&self, visitor_id: &str, request_id: Option<&str>) -> ServerSignals {
        let mut query = HistoryQuery::new(visitor_id);
        if let Some(request_id) = non_empty(request_id) {
            query = query.with_request_id(request_id);
        }

        let history = self.visitor_history(&query);
        let event = async {
            match non_empty(request_id) {
                Some(request_id) => Some(self.visit_details(request_id).await),
                None => None,
            }
        };
        let (history, event) = tokio::join!(history, event);

        let mut signals = ServerSignals::default();
        let mut last_failure = None;

        match history {
            Ok(history) => signals.visitor_history = Some(history),
            Err(err) => {
                log::warn!("failed to fetch visitor history: {}", err);
                last_failure = Some(err);
            }
        }
        match event {
            Some(Ok(Value::Null)) | None => {}
            Some(Ok(visit)) => signals.current_visit = Some(visit),
            Some(Err(err)) => {
                log::warn!("failed to fetch current visit details: {}", err);
                last_failure = Some(err);
            }
        }

        if signals.visitor_history.is_none()
            && signals.current_visit.is_none()
            && let Some(err) = last_failure
        {
            signals.error = Some(SourceError::new(err.to_string()).with_code(LOOKUP_ERROR_CODE));
        }
        signals
    }

    /// Probe `GET /visitors?limit=1` to check connectivity and credentials.
    pub async fn health(&self) -> HealthReport {
        let outcome = match self.url(&["visitors"]) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("limit", "1");
                self.http
                    .get(&url, &self.headers)
                    .await
                    .map_err(ServerApiError::from)
            }
            Err(err) => Err(err),
        };

        let mut report = HealthReport {
            status: HealthStatus::Ok,
            message: "Fingerprint Pro API 连接正常".to_string(),
            server_api_key: mask_secret(&self.config.secret_key),
            region: self.config.region,
            endpoint: self.endpoint.as_str().trim_end_matches('/').to_string(),
            server_api_reachable: false,
            server_api_status_code: None,
            server_error: None,
        };
        match outcome {
            Ok(response) => {
                report.server_api_reachable = response.is_success();
                report.server_api_status_code = Some(response.status);
            }
            Err(err) => {
                log::warn!("server api health probe failed: {}", err);
                report.status = HealthStatus::Partial;
                report.message = "服务端 API 连接失败".to_string();
                report.server_error = Some(err.to_string());
            }
        }
        report
    }

    async fn send(&self, url: &Url) -> Result<SignalHttpResponse, ServerApiError> {
        log::debug!("GET {}", url.path());
        let response = self.http.get(url, &self.headers).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(api_error(url, &response))
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ServerApiError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ServerApiError::Url(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn api_error(url: &Url, response: &SignalHttpResponse) -> ServerApiError {
    let (code, message) = match response.json::<ErrorEnvelope>() {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (format!("HTTP{}", response.status), response.text()),
    };

    if response.status == 404 {
        return ServerApiError::NotFound(format!("{} ({})", url.path(), message));
    }
    ServerApiError::Api {
        status: response.status,
        code,
        message,
    }
}

fn require_id<'a>(id: &'a str, what: &'static str) -> Result<&'a str, ServerApiError> {
    non_empty(Some(id)).ok_or(ServerApiError::InvalidId(what))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Fluent builder for [`FingerprintServerClient`].
pub struct FingerprintServerClientBuilder {
    config: ServerApiConfig,
    http: Option<Arc<dyn SignalHttpClient>>,
}

impl FingerprintServerClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerApiConfig::default(),
            http: None,
        }
    }

    pub fn with_config(mut self, config: ServerApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.config.secret_key = secret_key.into();
        self
    }

    pub fn with_region(mut self, region: ServerRegion) -> Self {
        self.config.region = region;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Replace the default reqwest transport.
    pub fn with_http_client(mut self, http: Arc<dyn SignalHttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<FingerprintServerClient, ServerApiError> {
        self.config.validate()?;
        let endpoint = self.config.endpoint()?;

        let secret = HeaderValue::from_str(self.config.secret_key.trim())
            .map_err(|_| ConfigError::InvalidSecretKey)?;
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(AUTH_HEADER), secret);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http: Arc<dyn SignalHttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestSignalClient::new(self.config.timeout)?),
        };

        Ok(FingerprintServerClient {
            http,
            config: self.config,
            endpoint,
            headers,
        })
    }
}

impl Default for FingerprintServerClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
