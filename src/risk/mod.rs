//! Composite risk scoring.
//!
//! Each risk-weighted registry field is resolved from the merged view and
//! counts toward the score when it fires. The vendor's continuous suspect
//! score is folded in as an extra, capped term. The total is clamped to
//! `0..=100` and bucketed into four levels.
//!
//! Missing data never raises an error; it simply does not fire. A low score
//! therefore means "nothing fired", which is not the same as "known safe".

mod summary;

pub use summary::RiskSummary;

use serde::Serialize;
use serde_json::Value;

use crate::fields::{FieldRegistry, resolve};
use crate::signals::MergedView;

/// Key of the vendor's 0–100 suspicion metric.
pub const SUSPECT_SCORE_KEY: &str = "suspectScore";

/// Upper bound on the suspect-score contribution.
pub const SUSPECT_SCORE_CAP: f64 = 30.0;

/// Numeric values above this fire a risk factor.
pub const NUMERIC_TRIGGER: f64 = 50.0;

const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Half-open buckets: `[0,20)`, `[20,50)`, `[50,80)`, `[80,100]`.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => RiskLevel::Critical,
            50..=79 => RiskLevel::High,
            20..=49 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "低风险",
            RiskLevel::Medium => "中等风险",
            RiskLevel::High => "高风险",
            RiskLevel::Critical => "严重风险",
        }
    }

    /// Collapse onto the three-level scale used by the summary card.
    pub fn legacy(&self) -> LegacyRiskLevel {
        match self {
            RiskLevel::Critical | RiskLevel::High => LegacyRiskLevel::High,
            RiskLevel::Medium => LegacyRiskLevel::Medium,
            RiskLevel::Low => LegacyRiskLevel::Low,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyRiskLevel {
    Low,
    Medium,
    High,
}

/// One risk-weighted field and whether it fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskFactor {
    pub key: &'static str,
    pub label: &'static str,
    pub weight: u32,
    pub triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    /// Every risk-weighted field, in registry order, fired or not.
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    pub fn triggered(&self) -> impl Iterator<Item = &RiskFactor> + '_ {
        self.factors.iter().filter(|factor| factor.triggered)
    }

    pub fn is_triggered(&self, key: &str) -> bool {
        self.triggered().any(|factor| factor.key == key)
    }
}

/// Score a merged view against the built-in registry.
pub fn score(merged: &MergedView) -> RiskAssessment {
    score_with(FieldRegistry::builtin(), Some(merged.as_value()))
}

/// Score an arbitrary signal tree against the built-in registry.
pub fn score_value(data: Option<&Value>) -> RiskAssessment {
    score_with(FieldRegistry::builtin(), data)
}

pub fn score_with(registry: &FieldRegistry, data: Option<&Value>) -> RiskAssessment {
    let mut raw = 0.0;
    let mut factors = Vec::new();

    for field in registry.iter() {
        let Some(weight) = field.weight() else {
            continue;
        };
        let triggered = fires(resolve(data, field.key));
        if triggered {
            raw += f64::from(weight);
        }
        factors.push(RiskFactor {
            key: field.key,
            label: field.label,
            weight,
            triggered,
        });
    }

    raw += suspect_contribution(resolve(data, SUSPECT_SCORE_KEY));

    let score = raw.clamp(0.0, MAX_SCORE).floor() as u8;
    let assessment = RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    };
    log::debug!(
        "risk score {} ({}), {} of {} factors triggered",
        assessment.score,
        assessment.level,
        assessment.triggered().count(),
        assessment.factors.len()
    );
    assessment
}

fn fires(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n > NUMERIC_TRIGGER),
        _ => false,
    }
}

/// Half the suspect score, capped. Only a positive JSON number counts.
fn suspect_contribution(value: Option<&Value>) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(suspect) if suspect > 0.0 => (suspect / 2.0).min(SUSPECT_SCORE_CAP),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldDescriptor, FieldGroup, ValueType};
    use serde_json::json;

    fn registry(weights: &[(&'static str, u32)]) -> FieldRegistry {
        FieldRegistry::from_descriptors(
            weights
                .iter()
                .map(|(key, weight)| {
                    FieldDescriptor::new(*key, *key, FieldGroup::RiskDetection, ValueType::Boolean)
                        .with_risk_weight(*weight)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn threshold_boundaries() {
        let cases = [
            (0, RiskLevel::Low),
            (19, RiskLevel::Low),
            (20, RiskLevel::Medium),
            (49, RiskLevel::Medium),
            (50, RiskLevel::High),
            (79, RiskLevel::High),
            (80, RiskLevel::Critical),
            (100, RiskLevel::Critical),
        ];
        for (score, level) in cases {
            assert_eq!(RiskLevel::from_score(score), level, "score {score}");
        }
    }

    #[test]
    fn exact_weights_hit_boundaries() {
        let registry = registry(&[("a", 19), ("b", 1), ("c", 30), ("d", 30)]);
        let assess = |data: serde_json::Value| score_with(&registry, Some(&data));

        let low = assess(json!({ "a": true }));
        assert_eq!((low.score, low.level), (19, RiskLevel::Low));
        let medium = assess(json!({ "a": true, "b": true }));
        assert_eq!((medium.score, medium.level), (20, RiskLevel::Medium));
        let high = assess(json!({ "a": true, "b": true, "c": true }));
        assert_eq!((high.score, high.level), (50, RiskLevel::High));
        let critical = assess(json!({ "a": true, "b": true, "c": true, "d": true }));
        assert_eq!((critical.score, critical.level), (80, RiskLevel::Critical));
    }

    #[test]
    fn trigger_predicate() {
        assert!(fires(Some(&json!(true))));
        assert!(fires(Some(&json!(51))));
        assert!(fires(Some(&json!(50.5))));
        assert!(!fires(Some(&json!(50))));
        assert!(!fires(Some(&json!(false))));
        assert!(!fires(Some(&json!("true"))));
        assert!(!fires(Some(&json!({ "result": true }))));
        assert!(!fires(None));
    }

    #[test]
    fn suspect_score_is_halved_and_capped() {
        let registry = registry(&[]);
        let assess = |data: serde_json::Value| score_with(&registry, Some(&data)).score;
        assert_eq!(assess(json!({ "suspectScore": 30 })), 15);
        assert_eq!(assess(json!({ "suspectScore": 99 })), 30);
        assert_eq!(assess(json!({ "suspectScore": 25 })), 12);
        assert_eq!(assess(json!({ "suspectScore": -10 })), 0);
        assert_eq!(assess(json!({ "suspectScore": "60" })), 0);
    }

    #[test]
    fn score_is_clamped() {
        let data = json!({
            "vpn": { "result": true },
            "tor": { "result": true },
            "tampering": { "result": true },
            "remoteControl": { "result": true },
            "suspectScore": 100
        });
        let assessment = score_value(Some(&data));
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn factors_follow_registry_order() {
        let assessment = score_value(None);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.factors.len(), 16);
        assert_eq!(assessment.factors[0].key, "incognito");
        assert!(assessment.factors.iter().all(|factor| !factor.triggered));
    }

    #[test]
    fn flipping_any_factor_never_lowers_the_score() {
        let base = json!({ "suspectScore": 40, "proxy": { "result": true } });
        let before = score_value(Some(&base)).score;

        for field in FieldRegistry::builtin().risk_weighted() {
            let mut data = base.clone();
            let mut cursor = &mut data;
            let segments: Vec<&str> = field.key.split('.').collect();
            for segment in &segments[..segments.len() - 1] {
                cursor = cursor
                    .as_object_mut()
                    .unwrap()
                    .entry(segment.to_string())
                    .or_insert_with(|| json!({}));
            }
            cursor
                .as_object_mut()
                .unwrap()
                .insert(segments[segments.len() - 1].to_string(), json!(true));

            assert!(score_value(Some(&data)).score >= before, "{}", field.key);
        }
    }

    #[test]
    fn level_helpers() {
        assert_eq!(RiskLevel::Critical.legacy(), LegacyRiskLevel::High);
        assert_eq!(RiskLevel::High.legacy(), LegacyRiskLevel::High);
        assert_eq!(RiskLevel::Medium.legacy(), LegacyRiskLevel::Medium);
        assert_eq!(RiskLevel::Low.label(), "低风险");
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
        assert_eq!(serde_json::to_value(RiskLevel::High).unwrap(), json!("high"));
    }
}
