//! # NDOC
//! component: `spec_store::guide`
//! purpose: Parses the free-text development guide (§4.2 source 1, §6
//!   "Specification document") into one `ParsedEventDefinition` per
//!   event, merging repeated mentions per the stated rule (allowed pages
//!   unioned, `required` disjunctively combined, firing condition is the
//!   first occurrence).

use crate::errors::OracleError;
use crate::model::{EventName, PageType, PageTypeSet, ParsedEventDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Section boundary, per §6: `(?:•\s*)?이벤트\s*이름\s*:\s*([a-z_]+)`,
/// case-insensitive. Sites using an English-only guide may instead mark
/// sections with `Event Name:`; both are recognized.
static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:•\s*)?(?:이벤트\s*이름|event\s*name)\s*:\s*([a-z_][a-z0-9_]*)").unwrap()
});

static REQUIRED_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)required\s*:\s*(yes|true|필수)").unwrap());
static FIRING_CONDITION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)firing\s*condition\s*:\s*(.+)").unwrap());
static REQUIRED_UI_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)required\s*ui\s*:\s*(.+)").unwrap());
static USER_ACTION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)user\s*action\s*:\s*(.+)").unwrap());
static ALLOWED_PAGES_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)allowed\s*page\s*types?\s*:\s*(.+)").unwrap());

const KNOWN_PAGE_TYPES: &[&str] = &[
    "MAIN",
    "PRODUCT_DETAIL",
    "PRODUCT_LIST",
    "SEARCH_RESULT",
    "CART",
    "ORDER",
    "ORDER_COMPLETE",
    "EVENT_DETAIL",
    "EVENT_LIST",
    "BRAND_MAIN",
    "BRAND_PRODUCT_LIST",
    "BRAND_EVENT_LIST",
    "BRAND_CUSTOM_ETC",
    "LIVE_DETAIL",
    "LIVE_LIST",
    "MY",
    "HISTORY",
    "OTHERS",
];

fn parse_allowed_pages(raw: &str) -> PageTypeSet {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("all") || trimmed.eq_ignore_ascii_case("전체") {
        return PageTypeSet::All;
    }
    let mut set = std::collections::HashSet::new();
    let upper = trimmed.to_uppercase();
    for candidate in KNOWN_PAGE_TYPES {
        if upper.contains(candidate) {
            set.insert(PageType::from(candidate.to_string()));
        }
    }
    PageTypeSet::Explicit(set)
}

fn split_into_sections(text: &str) -> Vec<(EventName, String)> {
    let headers: Vec<(usize, EventName)> = SECTION_HEADER
        .captures_iter(text)
        .map(|cap| (cap.get(0).unwrap().start(), cap[1].to_lowercase()))
        .collect();

    let mut sections = Vec::new();
    for (i, (start, name)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map(|(s, _)| *s).unwrap_or(text.len());
        sections.push((name.clone(), text[*start..end].to_string()));
    }
    sections
}

/// Parses the development guide text into a map of event name ->
/// merged `ParsedEventDefinition`.
pub fn parse_guide(
    text: &str,
) -> Result<HashMap<EventName, ParsedEventDefinition>, OracleError> {
    if text.trim().is_empty() {
        return Err(OracleError::config(
            "spec_store::guide",
            "development guide document is empty",
            "guide text",
        ));
    }

    let mut by_event: HashMap<EventName, ParsedEventDefinition> = HashMap::new();

    for (event_name, section) in split_into_sections(text) {
        let required = REQUIRED_FIELD.captures(&section).is_some();
        let firing_condition = FIRING_CONDITION_FIELD
            .captures(&section)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();
        let required_ui = REQUIRED_UI_FIELD
            .captures(&section)
            .map(|c| c[1].trim().to_string());
        let user_action_type = USER_ACTION_FIELD
            .captures(&section)
            .map(|c| c[1].trim().to_string());
        let allowed_page_types = ALLOWED_PAGES_FIELD
            .captures(&section)
            .map(|c| parse_allowed_pages(&c[1]))
            .unwrap_or_else(PageTypeSet::empty);

        let lower_section = section.to_lowercase();
        let auto_fire = lower_section.contains("autofire") || lower_section.contains("auto-fire");
        let requires_user_action =
            lower_section.contains("requiresuseraction") || lower_section.contains("requires user action");

        by_event
            .entry(event_name.clone())
            .and_modify(|existing| {
                existing.required = existing.required || required;
                existing.allowed_page_types.union(&allowed_page_types);
                existing.auto_fire = existing.auto_fire || auto_fire;
                existing.requires_user_action = existing.requires_user_action || requires_user_action;
                if existing.required_ui.is_none() {
                    existing.required_ui = required_ui.clone();
                }
                if existing.user_action_type.is_none() {
                    existing.user_action_type = user_action_type.clone();
                }
            })
            .or_insert(ParsedEventDefinition {
                event_name,
                required,
                firing_condition,
                required_ui,
                user_action_type,
                allowed_page_types,
                auto_fire,
                requires_user_action,
            });
    }

    Ok(by_event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_event_section() {
        let guide = "• 이벤트 이름: view_promotion\nRequired: Yes\nFiring Condition: fires on MAIN hero banner impression\nAllowed Page Types: MAIN\nUser Action: autoFire\n";
        let defs = parse_guide(guide).unwrap();
        let def = defs.get("view_promotion").unwrap();
        assert!(def.required);
        assert!(def.allowed_page_types.contains(&PageType::Main));
        assert!(def.auto_fire);
        assert!(def.firing_condition.contains("hero banner"));
    }

    #[test]
    fn merges_repeated_mentions_by_union_and_disjunction() {
        let guide = "\
Event Name: add_to_cart
Required: Yes
Allowed Page Types: PRODUCT_DETAIL
Firing Condition: first mention wins

Event Name: add_to_cart
Allowed Page Types: CART
Firing Condition: second mention should not override
";
        let defs = parse_guide(guide).unwrap();
        let def = defs.get("add_to_cart").unwrap();
        assert!(def.allowed_page_types.contains(&PageType::ProductDetail));
        assert!(def.allowed_page_types.contains(&PageType::Cart));
        assert!(def.firing_condition.contains("first mention wins"));
    }

    #[test]
    fn empty_guide_is_a_config_error() {
        assert!(parse_guide("").is_err());
    }

    #[test]
    fn all_keyword_resolves_to_page_type_set_all() {
        let guide = "Event Name: page_view\nAllowed Page Types: ALL\n";
        let defs = parse_guide(guide).unwrap();
        assert!(matches!(
            defs.get("page_view").unwrap().allowed_page_types,
            PageTypeSet::All
        ));
    }
}
