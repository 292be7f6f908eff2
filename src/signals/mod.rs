//! Signal source containers and the dual-source merge.
//!
//! A session sees two independent sources: the client-collected fingerprint
//! result and the server-side lookup. Each arrives in a container that may
//! carry a result, an error, or neither yet. [`merge`] reconciles them into
//! one [`MergedView`] with server values winning at the top level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::resolve;

/// Failure reported by a signal source in place of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// Client-side fingerprint collection state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSignals {
    pub result: Option<Value>,
    pub error: Option<SourceError>,
    pub is_loading: bool,
}

impl ClientSignals {
    pub fn loaded(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failed(error: SourceError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// The result, unless the source reported an error.
    pub fn usable_result(&self) -> Option<&Value> {
        match self.error {
            Some(_) => None,
            None => self.result.as_ref(),
        }
    }
}

/// Page of historical visits returned by the vendor's visitor endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorHistoryResponse {
    pub visitor_id: String,
    #[serde(default)]
    pub visits: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_key: Option<String>,
}

impl VisitorHistoryResponse {
    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    /// Most recent visit; the vendor returns visits newest first.
    pub fn latest_visit(&self) -> Option<&Value> {
        self.visits.first()
    }
}

/// Server-side lookup state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSignals {
    pub visitor_history: Option<VisitorHistoryResponse>,
    pub current_visit: Option<Value>,
    pub error: Option<SourceError>,
    pub is_loading: bool,
}

impl ServerSignals {
    pub fn failed(error: SourceError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: VisitorHistoryResponse) -> Self {
        self.visitor_history = Some(history);
        self
    }

    pub fn with_current_visit(mut self, visit: Value) -> Self {
        self.current_visit = Some(visit);
        self
    }

    pub fn usable_current_visit(&self) -> Option<&Value> {
        match self.error {
            Some(_) => None,
            None => self.current_visit.as_ref(),
        }
    }

    pub fn usable_history(&self) -> Option<&VisitorHistoryResponse> {
        match self.error {
            Some(_) => None,
            None => self.visitor_history.as_ref(),
        }
    }
}

/// Reconciled view of both sources. Always wraps a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedView(Value);

impl MergedView {
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Top-level member lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Dotted-path lookup.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        resolve(Some(&self.0), path)
    }

    pub fn len(&self) -> usize {
        self.0.as_object().map_or(0, Map::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MergedView {
    fn default() -> Self {
        Self::empty()
    }
}

/// Shallow merge with server precedence.
///
/// Top-level keys from `client` are copied first, then every top-level key of
/// `server` overwrites. Nested objects are replaced wholesale, never merged.
/// An absent, `null`, or non-object source contributes nothing.
pub fn merge(client: Option<&Value>, server: Option<&Value>) -> MergedView {
    let mut merged = Map::new();

    for (origin, source) in [("client", client), ("server", server)] {
        match source {
            Some(Value::Object(fields)) => {
                for (key, value) in fields {
                    merged.insert(key.clone(), value.clone());
                }
            }
            None | Some(Value::Null) => {}
            Some(other) => {
                log::debug!("ignoring non-object {} source: {}", origin, kind(other));
            }
        }
    }

    MergedView(Value::Object(merged))
}

/// Merge the usable parts of both containers. A source carrying an error
/// contributes nothing.
pub fn merge_sources(client: &ClientSignals, server: &ServerSignals) -> MergedView {
    merge(client.usable_result(), server.usable_current_visit())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_replaces_whole_top_level_values() {
        let client = json!({ "vpn": { "result": false, "methods": { "a": 1 } }, "ip": "10.0.0.1" });
        let server = json!({ "vpn": { "result": true } });

        let merged = merge(Some(&client), Some(&server));
        assert_eq!(merged.get("vpn"), Some(&json!({ "result": true })));
        assert_eq!(merged.get("ip"), Some(&json!("10.0.0.1")));
        assert_eq!(merged.resolve("vpn.methods.a"), None);
    }

    #[test]
    fn absent_sides_degrade_gracefully() {
        assert!(merge(None, None).is_empty());
        assert_eq!(merge(None, None).as_value(), &json!({}));

        let only_client = json!({ "visitorId": "v1" });
        assert_eq!(merge(Some(&only_client), None).as_value(), &only_client);
        assert_eq!(merge(None, Some(&only_client)).as_value(), &only_client);
    }

    #[test]
    fn non_object_sources_are_ignored() {
        let client = json!({ "visitorId": "v1" });
        let merged = merge(Some(&client), Some(&json!([1, 2, 3])));
        assert_eq!(merged.as_value(), &client);
        assert!(merge(Some(&json!("text")), Some(&Value::Null)).is_empty());
    }

    #[test]
    fn errored_sources_contribute_nothing() {
        let client = ClientSignals::loaded(json!({ "visitorId": "v1", "tor": { "result": false } }));
        let mut server = ServerSignals::default().with_current_visit(json!({ "tor": { "result": true } }));
        assert_eq!(merge_sources(&client, &server).resolve("tor.result"), Some(&json!(true)));

        server.error = Some(SourceError::new("lookup failed").with_code("SERVER_FETCH_ERROR"));
        let merged = merge_sources(&client, &server);
        assert_eq!(merged.resolve("tor.result"), Some(&json!(false)));

        let failed = ClientSignals::failed(SourceError::new("blocked"));
        assert!(merge_sources(&failed, &ServerSignals::default()).is_empty());
    }

    #[test]
    fn history_response_uses_vendor_field_names() {
        let history: VisitorHistoryResponse = serde_json::from_value(json!({
            "visitorId": "v1",
            "visits": [{ "requestId": "r2" }, { "requestId": "r1" }],
            "paginationKey": "r1"
        }))
        .unwrap();
        assert_eq!(history.visit_count(), 2);
        assert_eq!(history.latest_visit(), Some(&json!({ "requestId": "r2" })));
        assert_eq!(history.pagination_key.as_deref(), Some("r1"));
        assert_eq!(history.last_timestamp, None);
    }
}
