use serde::Serialize;
use serde_json::Value;

use super::{LegacyRiskLevel, RiskAssessment, score};
use crate::fields::{format::parse_timestamp, resolve};
use crate::signals::{MergedView, VisitorHistoryResponse};

const LOW_CONFIDENCE: f64 = 0.5;
const LAST_SEEN_FALLBACK: &str = "刚刚";
const LAST_SEEN_INVALID: &str = "无效时间";

/// Dashboard summary card derived from an assessment and its sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    pub risk_level: LegacyRiskLevel,
    /// Inverted score: 100 is the cleanest possible visitor.
    pub overall_score: u8,
    pub primary_concerns: Vec<&'static str>,
    pub recommendations: Vec<&'static str>,
    pub suspicious_activities: Vec<&'static str>,
    pub visit_count: usize,
    pub last_seen: String,
    pub is_new_visitor: bool,
    #[serde(skip)]
    pub assessment: RiskAssessment,
}

impl RiskSummary {
    /// Build the summary. `client` is the raw client result; identity fields
    /// (confidence, first/last seen, visitor found) are read from it rather
    /// than from the merged view.
    pub fn from_sources(
        merged: &MergedView,
        client: Option<&Value>,
        history: Option<&VisitorHistoryResponse>,
    ) -> Self {
        let assessment = score(merged);

        let mut primary_concerns = Vec::new();
        let mut recommendations = Vec::new();
        let mut suspicious_activities = Vec::new();

        for factor in assessment.triggered() {
            match factor.key {
                "vpn.result" => {
                    primary_concerns.push("检测到VPN使用");
                    recommendations.push("验证用户身份和访问意图");
                }
                "proxy.result" => {
                    primary_concerns.push("检测到代理服务器");
                    recommendations.push("评估代理使用的合理性");
                }
                "tor.result" => {
                    primary_concerns.push("检测到Tor网络访问");
                    recommendations.push("加强身份验证措施");
                }
                "tampering.result" => {
                    primary_concerns.push("检测到浏览器篡改");
                    recommendations.push("进行安全验证");
                }
                "incognito" => suspicious_activities.push("使用隐身模式访问"),
                "virtualMachine.result" => suspicious_activities.push("虚拟机环境访问"),
                "developerTools.result" => suspicious_activities.push("开发者工具活动"),
                _ => {}
            }
        }

        if resolve(client, "confidence.score")
            .and_then(Value::as_f64)
            .is_some_and(|confidence| confidence < LOW_CONFIDENCE)
        {
            suspicious_activities.push("设备指纹识别置信度较低");
        }

        let visit_count = history
            .map(VisitorHistoryResponse::visit_count)
            .filter(|count| *count > 0)
            .unwrap_or(1);

        let is_new_visitor = !resolve(client, "visitorFound").is_some_and(|found| match found {
            Value::Bool(flag) => *flag,
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::Array(_) | Value::Object(_) => true,
        });

        Self {
            risk_level: assessment.level.legacy(),
            overall_score: 100u8.saturating_sub(assessment.score),
            primary_concerns,
            recommendations,
            suspicious_activities,
            visit_count,
            last_seen: last_seen(resolve(client, "lastSeenAt.global")),
            is_new_visitor,
            assessment,
        }
    }
}

fn last_seen(value: Option<&Value>) -> String {
    match value {
        Some(value @ Value::String(text)) if !text.is_empty() => stamp(parse_timestamp(value)),
        Some(value @ Value::Number(_)) if value.as_f64() != Some(0.0) => {
            stamp(parse_timestamp(value))
        }
        _ => LAST_SEEN_FALLBACK.to_string(),
    }
}

fn stamp(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| LAST_SEEN_INVALID.to_string())
}
