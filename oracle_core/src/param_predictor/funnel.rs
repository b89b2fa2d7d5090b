//! # NDOC
//! component: `param_predictor::funnel`
//! purpose: Cross-event consistency checking for `FUNNEL_TRACKED`
//!   parameters (spec §4.5 "Funnel-consistency parameters", Testable
//!   Property 8). Promoted to a first-class C5 operation per
//!   SPEC_FULL.md, since the spec names the behavior but not an
//!   operation to run it.
//! invariants:
//!   - Comparison happens after normalisation, never on raw predicted
//!     values — two prices differing only by formatting must not raise
//!     a finding.

use super::normalize::normalize;
use crate::model::{EventName, FunnelConsistencyFinding, FunnelSeverity, ParameterPrediction, FUNNEL_TRACKED_PARAMS};
use std::collections::HashMap;

/// Mismatches in these are CRITICAL; everything else `FUNNEL_TRACKED` is
/// a WARNING (currently just `price`).
const IMMUTABLE_PARAMS: &[&str] = &["item_id", "item_name", "item_brand"];

/// The canonical `FUNNEL_TRACKED_PARAMS` entry matching `key`, if any —
/// used as the grouping key so `by_param` doesn't fragment on a
/// borrowed vs. 'static lifetime mismatch.
fn tracked_name(key: &str) -> Option<&'static str> {
    FUNNEL_TRACKED_PARAMS.iter().find(|p| **p == key).copied()
}

/// Checks one simulated funnel walk — `predictions` in funnel order
/// (e.g. `view_item`, `add_to_cart`, `begin_checkout`, `purchase`) for
/// the same item — for consistency of its `FUNNEL_TRACKED` parameters.
/// Events missing a tracked parameter, or predicting it as unresolved
/// (`null`), are simply excluded from that parameter's comparison set.
pub fn check_funnel(walk: &[(EventName, Vec<ParameterPrediction>)]) -> Vec<FunnelConsistencyFinding> {
    let mut by_param: HashMap<&str, Vec<(EventName, serde_json::Value)>> = HashMap::new();

    for (event_name, predictions) in walk {
        for prediction in predictions {
            let Some(tracked) = tracked_name(&prediction.key) else {
                continue;
            };
            if prediction.predicted_value.is_null() {
                continue;
            }
            let normalized = normalize(&prediction.key, &prediction.predicted_value);
            by_param
                .entry(tracked)
                .or_default()
                .push((event_name.clone(), normalized));
        }
    }

    let mut findings = Vec::new();
    for (param, observations) in by_param {
        if observations.len() < 2 {
            continue;
        }
        let first_value = &observations[0].1;
        if observations.iter().all(|(_, v)| v == first_value) {
            continue;
        }
        let severity = if IMMUTABLE_PARAMS.contains(&param) {
            FunnelSeverity::Critical
        } else {
            FunnelSeverity::Warning
        };
        findings.push(FunnelConsistencyFinding {
            parameter: param.to_string(),
            severity,
            events: observations.iter().map(|(e, _)| e.clone()).collect(),
            observed_values: observations.into_iter().map(|(_, v)| v).collect(),
        });
    }

    findings.sort_by(|a, b| a.parameter.cmp(&b.parameter));
    findings
}
