//! Per-page signal session.
//!
//! Holds the two source containers and derives everything else on demand:
//! the merged view, the risk assessment, the summary card, and formatted
//! fields. Nothing is cached, so every call reflects the current inputs.

use serde_json::Value;

use crate::fields::{self, FormattedField};
use crate::risk::{self, RiskAssessment, RiskSummary};
use crate::server::FingerprintServerClient;
use crate::signals::{self, ClientSignals, MergedView, ServerSignals};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSession {
    client: ClientSignals,
    server: ServerSignals,
}

impl SignalSession {
    pub fn new(client: ClientSignals, server: ServerSignals) -> Self {
        Self { client, server }
    }

    /// Session with only a client result.
    pub fn from_client_result(result: Value) -> Self {
        Self::new(ClientSignals::loaded(result), ServerSignals::default())
    }

    pub fn with_client(mut self, client: ClientSignals) -> Self {
        self.client = client;
        self
    }

    pub fn with_server(mut self, server: ServerSignals) -> Self {
        self.server = server;
        self
    }

    pub fn client(&self) -> &ClientSignals {
        &self.client
    }

    pub fn server(&self) -> &ServerSignals {
        &self.server
    }

    pub fn set_client(&mut self, client: ClientSignals) {
        self.client = client;
    }

    pub fn set_server(&mut self, server: ServerSignals) {
        self.server = server;
    }

    pub fn is_loading(&self) -> bool {
        self.client.is_loading || self.server.is_loading
    }

    /// Server data arrived and carries something usable.
    pub fn has_server_data(&self) -> bool {
        self.server.usable_current_visit().is_some() || self.server.usable_history().is_some()
    }

    pub fn visitor_id(&self) -> Option<&str> {
        self.client
            .usable_result()
            .and_then(|result| result.get("visitorId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.client
            .usable_result()
            .and_then(|result| result.get("requestId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn merged(&self) -> MergedView {
        signals::merge_sources(&self.client, &self.server)
    }

    pub fn assess(&self) -> RiskAssessment {
        risk::score(&self.merged())
    }

    /// Summary card, available once a client result exists.
    pub fn summary(&self) -> Option<RiskSummary> {
        let client = self.client.usable_result()?;
        Some(RiskSummary::from_sources(
            &self.merged(),
            Some(client),
            self.server.usable_history(),
        ))
    }

    pub fn field(&self, key: &str) -> FormattedField {
        fields::resolve_and_format(Some(self.merged().as_value()), key)
    }

    pub fn fields<I, S>(&self, keys: I) -> Vec<FormattedField>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        fields::formatted_fields(Some(self.merged().as_value()), keys)
    }

    pub fn search<I, S>(&self, keys: I, query: &str) -> Vec<FormattedField>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        fields::filter_and_search_fields(Some(self.merged().as_value()), keys, query)
    }

    /// Run the server lookup for this session's visitor and store the result.
    /// Does nothing without a visitor id.
    pub async fn refresh_server(&mut self, api: &FingerprintServerClient) {
        let Some(visitor_id) = self.visitor_id().map(str::to_owned) else {
            log::debug!("skipping server lookup: no visitor id");
            return;
        };
        let request_id = self.request_id().map(str::to_owned);

        self.server.is_loading = true;
        let server = api.lookup(&visitor_id, request_id.as_deref()).await;
        log::info!(
            "server lookup for {} finished (history: {}, current visit: {})",
            visitor_id,
            server.visitor_history.is_some(),
            server.current_visit.is_some()
        );
        self.server = server;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLevel;
    use crate::server::{SignalHttpClient, SignalHttpClientError, SignalHttpResponse};
    use crate::signals::SourceError;
    use async_trait::async_trait;
    use http::HeaderMap;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use url::Url;

    /// Serves a fixed history and event; records request paths.
    struct StubClient {
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SignalHttpClient for StubClient {
        async fn get(
            &self,
            url: &Url,
            _headers: &HeaderMap,
        ) -> Result<SignalHttpResponse, SignalHttpClientError> {
            self.paths.lock().unwrap().push(url.path().to_string());
            let body = match url.path() {
                "/visitors/v1" => json!({
                    "visitorId": "v1",
                    "visits": [{ "requestId": "r1" }, { "requestId": "r0" }]
                }),
                "/events/r1" => json!({ "products": { "tor": { "result": true } } }),
                _ => return Err(SignalHttpClientError::Transport("connection refused".into())),
            };
            Ok(SignalHttpResponse::new(200, body.to_string()))
        }
    }

    fn api() -> (Arc<StubClient>, FingerprintServerClient) {
        let stub = Arc::new(StubClient {
            paths: Mutex::new(Vec::new()),
        });
        let api = FingerprintServerClient::builder()
            .with_secret_key("sk_test_abcdefgh")
            .with_http_client(stub.clone())
            .build()
            .unwrap();
        (stub, api)
    }

    fn client_result() -> Value {
        json!({
            "visitorId": "v1",
            "requestId": "r1",
            "visitorFound": true,
            "confidence": { "score": 0.97 },
            "vpn": { "result": false, "methods": { "timezoneMismatch": false } },
            "ip": "203.0.113.7"
        })
    }

    #[test]
    fn server_visit_overrides_client_view() {
        let session = SignalSession::from_client_result(client_result()).with_server(
            ServerSignals::default().with_current_visit(json!({
                "vpn": { "result": true },
                "remoteControl": { "result": true }
            })),
        );

        assert!(session.has_server_data());
        let assessment = session.assess();
        assert_eq!(assessment.score, 65);
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(session.field("vpn.result").formatted, "⚠️ 检测到");
        assert_eq!(session.field("vpn.methods.timezoneMismatch").raw, None);
    }

    #[test]
    fn failed_server_is_ignored() {
        let session = SignalSession::from_client_result(client_result()).with_server(
            ServerSignals::failed(SourceError::new("timeout").with_code("SERVER_FETCH_ERROR")),
        );
        assert!(!session.has_server_data());
        assert_eq!(session.assess().score, 0);
        assert_eq!(session.summary().map(|s| s.overall_score), Some(100));
    }

    #[test]
    fn no_client_result_means_no_summary() {
        let session = SignalSession::default().with_client(ClientSignals::loading());
        assert!(session.is_loading());
        assert!(session.summary().is_none());
        assert!(session.visitor_id().is_none());
        assert!(session.merged().is_empty());
    }

    #[test]
    fn fields_and_search() {
        let session = SignalSession::from_client_result(client_result());
        let shown = session.fields(["ip", "linkedId", "confidence.score"]);
        let keys: Vec<&str> = shown.iter().map(|field| field.key.as_str()).collect();
        assert_eq!(keys, vec!["ip", "confidence.score"]);
        assert_eq!(shown[1].formatted, "极高 (97.0%)");

        let hits = session.search(["ip", "confidence.score"], "ip address");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "ip");
    }

    #[tokio::test]
    async fn refresh_replaces_server_container() {
        let (stub, api) = api();
        let mut session = SignalSession::from_client_result(client_result())
            .with_server(ServerSignals::failed(SourceError::new("stale")));

        session.refresh_server(&api).await;

        let mut paths = stub.paths.lock().unwrap().clone();
        paths.sort();
        assert_eq!(paths, vec!["/events/r1", "/visitors/v1"]);
        assert!(!session.is_loading());
        assert!(session.server().error.is_none());
        assert!(session.has_server_data());
        assert_eq!(session.field("tor.result").formatted, "⚠️ 检测到");
        assert_eq!(session.summary().map(|s| s.visit_count), Some(2));
    }

    #[tokio::test]
    async fn refresh_without_visitor_id_is_skipped() {
        let (stub, api) = api();
        let mut session = SignalSession::default();

        session.refresh_server(&api).await;

        assert!(stub.paths.lock().unwrap().is_empty());
        assert_eq!(session.server(), &ServerSignals::default());
    }
}
