//! # NDOC
//! component: `gating::edge_cases`
//! purpose: Stage 2's static per-event conditional registry (spec §4.4
//!   Stage 2), modeled as data per Design Note "Configuration as data".

use crate::model::{PageContext, PageType};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One event's conditional firing rule. `allowed_page_types` distinguishes
/// "no restriction" (`None`) from "disabled everywhere" (`Some(vec![])`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCaseRule {
    pub event_name: String,
    pub condition: String,
    pub description: String,
    #[serde(default)]
    pub required_element: Option<String>,
    #[serde(default)]
    pub allowed_page_types: Option<Vec<PageType>>,
    #[serde(default)]
    pub allowed_url_patterns: Vec<String>,
}

/// Stage 2's verdict for one event: either a block (with reason), an
/// explicit admit that overrides Stage 1's verdict, or no opinion (the
/// registry has no rule for this event).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeCaseVerdict {
    Blocked(String),
    AdmitOverride(String),
    NoRule,
}

fn compiled_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

/// Evaluates one event against the registry, per the Stage 2 semantics
/// enumerated in order in spec §4.4.
pub fn evaluate(
    rules: &[EdgeCaseRule],
    event_name: &str,
    page_ctx: &PageContext,
    dom_has_required_element: Option<bool>,
    has_live_performance_signal: bool,
) -> EdgeCaseVerdict {
    let Some(rule) = rules.iter().find(|r| r.event_name == event_name) else {
        return EdgeCaseVerdict::NoRule;
    };

    if let Some(allowed) = &rule.allowed_page_types {
        if allowed.is_empty() {
            return EdgeCaseVerdict::Blocked(format!(
                "[edge-case] {} disabled everywhere ({})",
                event_name, rule.description
            ));
        }
        if !allowed.contains(&page_ctx.page_type) {
            return EdgeCaseVerdict::Blocked(format!(
                "[edge-case] {} only allowed on {:?}",
                event_name, allowed
            ));
        }
    }

    if !rule.allowed_url_patterns.is_empty() {
        let patterns = compiled_patterns(&rule.allowed_url_patterns);
        if !patterns.iter().any(|p| p.is_match(&page_ctx.url)) {
            return EdgeCaseVerdict::Blocked(format!(
                "[edge-case] {} URL pattern restriction",
                event_name
            ));
        }
    }

    if rule.required_element.is_some() {
        if let Some(has_match) = dom_has_required_element {
            if !has_match {
                return EdgeCaseVerdict::Blocked(format!(
                    "[edge-case] {} required element not found",
                    event_name
                ));
            }
        }
    }

    if rule.condition == "performance_threshold" && !has_live_performance_signal {
        return EdgeCaseVerdict::Blocked(format!(
            "[edge-case] {} performance threshold signal unavailable",
            event_name
        ));
    }

    EdgeCaseVerdict::AdmitOverride(format!("[edge-case] {} admitted ({})", event_name, rule.description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_context::{signals::NoDomSignals, RuntimeSignalInputs};

    fn ctx(url: &str, page_type: PageType) -> PageContext {
        let mut c = crate::page_context::detect(url, &RuntimeSignalInputs::default(), &NoDomSignals);
        c.page_type = page_type;
        c
    }

    #[test]
    fn disabled_everywhere_blocks_regardless_of_page() {
        let rules = vec![EdgeCaseRule {
            event_name: "beta_feature_track".to_string(),
            condition: "manual_disable".to_string(),
            description: "temporarily disabled".to_string(),
            required_element: None,
            allowed_page_types: Some(vec![]),
            allowed_url_patterns: vec![],
        }];
        let verdict = evaluate(
            &rules,
            "beta_feature_track",
            &ctx("https://shop.example.com/display/main", PageType::Main),
            None,
            false,
        );
        assert!(matches!(verdict, EdgeCaseVerdict::Blocked(_)));
    }

    #[test]
    fn url_pattern_restriction_blocks_when_unmatched() {
        let rules = vec![EdgeCaseRule {
            event_name: "sign_up".to_string(),
            condition: "url_gate".to_string(),
            description: "only on signup completion".to_string(),
            required_element: None,
            allowed_page_types: None,
            allowed_url_patterns: vec![r"/signupComplete".to_string()],
        }];
        let verdict = evaluate(
            &rules,
            "sign_up",
            &ctx("https://shop.example.com/login", PageType::Others),
            None,
            false,
        );
        assert!(matches!(verdict, EdgeCaseVerdict::Blocked(ref r) if r.contains("URL pattern")));
    }

    #[test]
    fn no_rule_for_event_is_no_opinion() {
        let verdict = evaluate(
            &[],
            "view_item",
            &ctx("https://shop.example.com/prd/detail/1", PageType::ProductDetail),
            None,
            false,
        );
        assert_eq!(verdict, EdgeCaseVerdict::NoRule);
    }

    #[test]
    fn required_element_absent_blocks() {
        let rules = vec![EdgeCaseRule {
            event_name: "newsletter_signup".to_string(),
            condition: "element_present".to_string(),
            description: "footer form".to_string(),
            required_element: Some(".footer-newsletter".to_string()),
            allowed_page_types: None,
            allowed_url_patterns: vec![],
        }];
        let verdict = evaluate(
            &rules,
            "newsletter_signup",
            &ctx("https://shop.example.com/display/main", PageType::Main),
            Some(false),
            false,
        );
        assert!(matches!(verdict, EdgeCaseVerdict::Blocked(_)));
    }
}
