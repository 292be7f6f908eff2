//! Value formatting for display.
//!
//! Turns a resolved raw value plus its descriptor into a display string.
//! Named formatters are a closed set; a formatter that cannot handle its input
//! is logged and the value falls back to type-based formatting, so callers
//! always get a string back.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use super::path::resolve;
use super::registry::{self, FieldDescriptor};

/// Rendered in place of an absent value on fields that do not hide empties.
pub const PLACEHOLDER: &str = "-";

/// Rendered when an object cannot be serialised.
pub const OBJECT_MARKER: &str = "[Object]";

const YES: &str = "是";
const NO: &str = "否";
const DETECTED: &str = "⚠️ 检测到";
const NOT_DETECTED: &str = "✅ 未检测到";
const UNKNOWN_TIME: &str = "未知";
const INVALID_TIME: &str = "无效时间";
const JUST_NOW: &str = "刚刚";

/// Built-in named formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Formatter {
    #[serde(rename = "formatBoolean")]
    Boolean,
    #[serde(rename = "formatRiskBoolean")]
    RiskBoolean,
    #[serde(rename = "formatConfidence")]
    Confidence,
    #[serde(rename = "formatScore")]
    Score,
    #[serde(rename = "formatNumber")]
    Number,
    #[serde(rename = "formatCoordinate")]
    Coordinate,
    #[serde(rename = "formatDistance")]
    Distance,
    #[serde(rename = "formatTimestamp")]
    Timestamp,
    #[serde(rename = "formatObject")]
    Object,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("{formatter} expects a numeric value, got `{value}`")]
    NotNumeric {
        formatter: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown formatter `{0}`")]
pub struct UnknownFormatter(pub String);

impl Formatter {
    pub const ALL: [Formatter; 9] = [
        Formatter::Boolean,
        Formatter::RiskBoolean,
        Formatter::Confidence,
        Formatter::Score,
        Formatter::Number,
        Formatter::Coordinate,
        Formatter::Distance,
        Formatter::Timestamp,
        Formatter::Object,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Formatter::Boolean => "formatBoolean",
            Formatter::RiskBoolean => "formatRiskBoolean",
            Formatter::Confidence => "formatConfidence",
            Formatter::Score => "formatScore",
            Formatter::Number => "formatNumber",
            Formatter::Coordinate => "formatCoordinate",
            Formatter::Distance => "formatDistance",
            Formatter::Timestamp => "formatTimestamp",
            Formatter::Object => "formatObject",
        }
    }

    /// Apply this formatter to a non-empty value. `now` anchors relative
    /// timestamps.
    pub fn apply(&self, value: &Value, now: DateTime<Utc>) -> Result<String, FormatError> {
        let text = match self {
            Formatter::Boolean => yes_no(truthy(value)).to_string(),
            Formatter::RiskBoolean => detection(truthy(value)).to_string(),
            Formatter::Confidence => match to_number(value) {
                Some(ratio) => confidence_band(ratio),
                None => PLACEHOLDER.to_string(),
            },
            Formatter::Score => format!("{}/100", js_number(to_number(value).unwrap_or(0.0))),
            Formatter::Number => grouped_number(self.numeric(value)?),
            Formatter::Coordinate => format!("{:.6}", self.numeric(value)?),
            Formatter::Distance => format!("{} km", js_number(self.numeric(value)?)),
            Formatter::Timestamp => relative_timestamp(value, now),
            Formatter::Object => match value {
                Value::Object(_) | Value::Array(_) => pretty_json(value),
                _ => String::new(),
            },
        };
        Ok(text)
    }

    fn numeric(&self, value: &Value) -> Result<f64, FormatError> {
        to_number(value).ok_or_else(|| FormatError::NotNumeric {
            formatter: self.name(),
            value: value.to_string(),
        })
    }
}

impl FromStr for Formatter {
    type Err = UnknownFormatter;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Formatter::ALL
            .into_iter()
            .find(|formatter| formatter.name() == name)
            .ok_or_else(|| UnknownFormatter(name.to_string()))
    }
}

impl std::fmt::Display for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Absent, `null`, blank string, empty array, or empty object.
pub fn is_empty(value: Option<&Value>) -> bool {
    value.is_none_or(is_blank)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Format a raw value for display using the wall clock for timestamps.
pub fn format_value(value: Option<&Value>, field: Option<&FieldDescriptor>) -> String {
    format_value_at(value, field, Utc::now())
}

/// Format a raw value for display relative to `now`.
pub fn format_value_at(
    value: Option<&Value>,
    field: Option<&FieldDescriptor>,
    now: DateTime<Utc>,
) -> String {
    let Some(value) = value.filter(|value| !is_blank(value)) else {
        return if field.is_some_and(|field| field.hide_empty) {
            String::new()
        } else {
            PLACEHOLDER.to_string()
        };
    };

    if let Some(field) = field
        && let Some(formatter) = field.formatter
    {
        match formatter.apply(value, now) {
            Ok(text) => return text,
            Err(err) => log::warn!("formatter error for field {}: {}", field.key, err),
        }
    }

    default_format(value)
}

fn default_format(value: &Value) -> String {
    match value {
        Value::Bool(flag) => yes_no(*flag).to_string(),
        Value::Number(number) => grouped_number(number.as_f64().unwrap_or_default()),
        Value::Array(items) => items.iter().map(element_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => pretty_json(value),
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
    }
}

fn element_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => js_number(number.as_f64().unwrap_or_default()),
        Value::Array(items) => items.iter().map(element_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Text placed on the clipboard for a field value.
pub fn copy_text(value: Option<&Value>) -> String {
    match value {
        Some(value) if !is_blank(value) => match value {
            Value::Object(_) | Value::Array(_) => pretty_json(value),
            Value::String(text) => text.clone(),
            Value::Number(number) => js_number(number.as_f64().unwrap_or_default()),
            other => other.to_string(),
        },
        _ => String::new(),
    }
}

/// A registry field resolved and rendered against one data tree.
#[derive(Debug, Clone, Serialize)]
pub struct FormattedField {
    pub key: String,
    pub field: Option<&'static FieldDescriptor>,
    pub raw: Option<Value>,
    pub formatted: String,
    pub should_show: bool,
    pub is_empty: bool,
}

/// Resolve `key` against `data` and format it with the built-in registry.
pub fn resolve_and_format(data: Option<&Value>, key: &str) -> FormattedField {
    resolve_and_format_at(data, key, Utc::now())
}

pub fn resolve_and_format_at(
    data: Option<&Value>,
    key: &str,
    now: DateTime<Utc>,
) -> FormattedField {
    let field = registry::lookup(key);
    let raw = resolve(data, key);
    let empty = is_empty(raw);

    FormattedField {
        key: key.to_string(),
        field,
        raw: raw.cloned(),
        formatted: format_value_at(raw, field, now),
        should_show: !field.is_some_and(|field| field.hide_empty) || !empty,
        is_empty: empty,
    }
}

/// Resolve and format several keys, dropping fields that should be hidden.
pub fn formatted_fields<I, S>(data: Option<&Value>, keys: I) -> Vec<FormattedField>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let now = Utc::now();
    keys.into_iter()
        .map(|key| resolve_and_format_at(data, key.as_ref(), now))
        .filter(|field| field.should_show)
        .collect()
}

/// Like [`formatted_fields`], narrowed to fields whose label, English label,
/// description, or formatted value contains `query` (case-insensitive).
pub fn filter_and_search_fields<I, S>(
    data: Option<&Value>,
    keys: I,
    query: &str,
) -> Vec<FormattedField>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let fields = formatted_fields(data, keys);
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return fields;
    }

    fields
        .into_iter()
        .filter(|item| {
            let Some(field) = item.field else {
                return false;
            };
            field.label.to_lowercase().contains(&query)
                || field
                    .label_en
                    .is_some_and(|label| label.to_lowercase().contains(&query))
                || field
                    .description
                    .is_some_and(|text| text.to_lowercase().contains(&query))
                || item.formatted.to_lowercase().contains(&query)
        })
        .collect()
}

fn yes_no(flag: bool) -> &'static str {
    if flag { YES } else { NO }
}

fn detection(flag: bool) -> &'static str {
    if flag { DETECTED } else { NOT_DETECTED }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric coercion for scalar values; strings are parsed after trimming and
/// a blank string counts as zero.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Some(0.0)
            } else {
                text.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Shortest plain rendering: integral values print without a fraction.
fn js_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Thousands-grouped numeral with at most three fraction digits.
fn grouped_number(n: f64) -> String {
    let rounded = format!("{:.3}", n.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((&rounded, ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (position, digit) in int_part.chars().enumerate() {
        if position > 0 && (int_part.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = n < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

fn confidence_band(ratio: f64) -> String {
    let band = if ratio >= 0.9 {
        "极高"
    } else if ratio >= 0.8 {
        "高"
    } else if ratio >= 0.6 {
        "中等"
    } else if ratio >= 0.4 {
        "较低"
    } else {
        "低"
    };
    format!("{} ({:.1}%)", band, ratio * 100.0)
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        log::debug!("object serialisation failed: {}", err);
        OBJECT_MARKER.to_string()
    })
}

fn relative_timestamp(value: &Value, now: DateTime<Utc>) -> String {
    if !truthy(value) {
        return UNKNOWN_TIME.to_string();
    }
    let Some(at) = parse_timestamp(value) else {
        return INVALID_TIME.to_string();
    };

    let elapsed = now - at;
    if elapsed.num_days() > 0 {
        format!("{}天前", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}小时前", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}分钟前", elapsed.num_minutes())
    } else {
        JUST_NOW.to_string()
    }
}

/// Accepts RFC 3339, ISO date-times with a compact `+hhmm` offset, naive ISO
/// date-times (taken as UTC), plain dates, and numeric epoch milliseconds.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis as i64)
        }
        Value::String(text) => parse_timestamp_str(text.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(at.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
