//! # fingerprint-risk-rs
//!
//! Risk scoring and field normalization for browser fingerprint dashboards.
//!
//! Signal data arrives from two places: a client-side fingerprint result and
//! a server-side lookup against the vendor API. Both are untyped JSON trees.
//! This crate merges them, resolves any registered field by its dotted path,
//! renders it for display, and computes a weighted composite risk score.
//!
//! ## Features
//!
//! - Declarative registry of vendor fields with labels, groups and weights
//! - Total nested-path resolution (never fails on missing data)
//! - Display formatting with placeholder and hide-empty handling
//! - Shallow dual-source merge with server precedence
//! - Four-level risk bucketing and a dashboard summary
//! - Async vendor server API client behind a pluggable transport
//!
//! ## Example
//!
//! ```
//! use fingerprint_risk_rs::{RiskLevel, merge, score};
//! use serde_json::json;
//!
//! let client = json!({ "visitorId": "v1", "vpn": { "result": true }, "suspectScore": 60 });
//! let server = json!({ "tor": { "result": true } });
//!
//! let assessment = score(&merge(Some(&client), Some(&server)));
//! assert_eq!(assessment.score, 85);
//! assert_eq!(assessment.level, RiskLevel::Critical);
//! ```

pub mod config;
pub mod fields;
pub mod risk;
pub mod server;
pub mod session;
pub mod signals;

pub use crate::config::{ConfigError, ServerApiConfig, ServerRegion};

pub use crate::fields::{
    FieldDescriptor, FieldGroup, FieldRegistry, FormattedField, Formatter, RegistryError,
    ValueType, copy_text, filter_and_search_fields, format_value, format_value_at,
    formatted_fields, is_empty, list_by_group, list_critical, list_risk_weighted, lookup,
    resolve, resolve_and_format,
};

pub use crate::risk::{
    LegacyRiskLevel, RiskAssessment, RiskFactor, RiskLevel, RiskSummary, score, score_value,
    score_with,
};

pub use crate::server::{
    FingerprintServerClient, FingerprintServerClientBuilder, HealthReport, HealthStatus,
    HistoryQuery, ReqwestSignalClient, ServerApiError, SignalHttpClient, SignalHttpClientError,
    SignalHttpResponse,
};

pub use crate::session::SignalSession;

pub use crate::signals::{
    ClientSignals, MergedView, ServerSignals, SourceError, VisitorHistoryResponse, merge,
    merge_sources,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
