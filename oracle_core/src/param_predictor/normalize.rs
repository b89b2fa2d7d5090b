//! # NDOC
//! component: `param_predictor::normalize`
//! purpose: Canonicalizes a predicted value for cross-analysis and
//!   funnel comparison, per spec §4.5 "Normalisation for comparison".
//!   Never used to alter `ParameterPrediction.predicted_value` itself —
//!   only by downstream comparison (funnel-consistency, and any external
//!   validator diffing against captured data).

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const BRAND_SITE_AFFIXES: &[&str] = &["[Brand]", "(공식)", "공식", "Official"];

/// Dispatches to the field-kind-specific rule by matching substrings of
/// `key`, per the table in §4.5. Falls through unchanged for keys that
/// match none of the named kinds.
pub fn normalize(key: &str, value: &Value) -> Value {
    let lower = key.to_lowercase();
    if lower.contains("price") || lower == "value" {
        normalize_price(value)
    } else if lower.contains("quantity") || lower.contains("index") {
        normalize_integer(value)
    } else if lower.contains("name") {
        normalize_name(value)
    } else if lower.contains("id") {
        normalize_id(value)
    } else if lower == "currency" {
        normalize_currency(value)
    } else {
        value.clone()
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_price(value: &Value) -> Value {
    let Some(text) = as_text(value) else {
        return value.clone();
    };
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match Decimal::from_str(&cleaned) {
        Ok(d) => Value::String(d.round_dp(2).to_string()),
        Err(_) => value.clone(),
    }
}

fn normalize_integer(value: &Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Value::from)
            .unwrap_or_else(|| value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        _ => value.clone(),
    }
}

fn normalize_name(value: &Value) -> Value {
    let Some(text) = as_text(value) else {
        return value.clone();
    };
    let mut collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for affix in BRAND_SITE_AFFIXES {
        collapsed = collapsed.replace(affix, "");
    }
    Value::String(collapsed.trim().to_lowercase())
}

fn normalize_id(value: &Value) -> Value {
    let Some(text) = as_text(value) else {
        return value.clone();
    };
    Value::String(text.trim().to_uppercase())
}

fn normalize_currency(value: &Value) -> Value {
    normalize_id(value)
}
