//! # NDOC
//! component: `param_predictor::classify`
//! purpose: Stage 1 of C5 — assigns each parameter key exactly one
//!   `ParameterClassification` label by consulting a fixed cascade of
//!   static tables, per spec §4.5 "Classification function". The same
//!   tables double as the first three steps of value derivation, since a
//!   key that classifies via a fixed-value table already carries its
//!   value.
//! invariants:
//!   - The cascade order is significant: the first matching table wins,
//!     independent of whether a later table would also match.

use crate::model::{ParameterClassification, PageType};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

const ECOMMERCE_EVENTS: &[&str] = &[
    "view_item",
    "view_item_list",
    "select_item",
    "add_to_cart",
    "remove_from_cart",
    "view_cart",
    "begin_checkout",
    "add_payment_info",
    "add_shipping_info",
    "purchase",
    "view_promotion",
    "select_promotion",
];

/// Step 1 — URL-derived values that vary per visit (e.g. a free-text
/// search term in the query string): `DYNAMIC` even though the value
/// comes from the URL, because the URL itself isn't canonical across
/// visits the way an item id in the path is.
static URL_VARIABLE_PARAMS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
    m.insert("view_search_results", ["search_term"].into_iter().collect());
    m
});

/// Step 2 — values true regardless of event or page.
static CONSTANT_PARAMS: Lazy<HashMap<&'static str, Value>> =
    Lazy::new(|| HashMap::from([("platform", json!("web"))]));

/// Step 3 — values fixed per event, e.g. `event_category = "ecommerce"`
/// for every ecommerce event.
static EVENT_FIXED_PARAMS: Lazy<HashMap<&'static str, HashMap<&'static str, Value>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, HashMap<&'static str, Value>> = HashMap::new();
    for event in ECOMMERCE_EVENTS {
        m.insert(event, HashMap::from([("event_category", json!("ecommerce"))]));
    }
    m.entry("purchase")
        .or_default()
        .insert("currency", json!("KRW"));
    m
});

/// Step 4 — keys stable at a canonical URL, e.g. the item id extracted
/// from a product detail page's path. No fixed value here; the value
/// comes from URL extraction (value-derivation step 4), this table only
/// marks which keys are expected to resolve that way.
static URL_FIXED_PARAMS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
    for event in ["view_item", "add_to_cart", "remove_from_cart"] {
        m.insert(event, ["item_id"].into_iter().collect());
    }
    m
});

/// Step 5 — values only known once the visitor performs the action.
static USER_ACTION_PARAMS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
    m.insert("add_to_cart", ["quantity"].into_iter().collect());
    m.insert(
        "purchase",
        ["payment_type", "shipping_tier"].into_iter().collect(),
    );
    m
});

/// Step 6 — values keyed by the page's content group (page type),
/// optionally overridden by a dataLayer-observed page type for SPA
/// navigations (handled by the caller, not this table).
static CONTENT_GROUP_BASED_PARAMS: Lazy<HashMap<&'static str, HashMap<&'static str, HashMap<&'static str, Value>>>> =
    Lazy::new(|| {
        let mut m: HashMap<&'static str, HashMap<&'static str, HashMap<&'static str, Value>>> = HashMap::new();
        let list_name_by_page = HashMap::from([
            ("PRODUCT_LIST", json!("product_list")),
            ("SEARCH_RESULT", json!("search_result")),
            ("BRAND_PRODUCT_LIST", json!("brand_product_list")),
        ]);
        m.insert(
            "view_item_list",
            HashMap::from([("item_list_name", list_name_by_page.clone())]),
        );
        m.insert(
            "select_item",
            HashMap::from([("item_list_name", list_name_by_page)]),
        );
        m
    });

/// Step 7 — generic page-context fields every page carries, not specific
/// to one event.
static PAGE_CONTEXT_PARAMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "page_location",
        "page_title",
        "page_referrer",
        "search_term",
        "promotion_name",
        "live_title",
    ]
    .into_iter()
    .collect()
});

/// Maps a parameter key to the URL-extracted-parameter name that
/// supplies it, where they differ (value-derivation step 4).
static URL_EXTRACTION_ALIASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("item_id", "product_id")]));

pub fn classify(event_name: &str, key: &str) -> ParameterClassification {
    if URL_VARIABLE_PARAMS
        .get(event_name)
        .map(|s| s.contains(key))
        .unwrap_or(false)
    {
        return ParameterClassification::Dynamic;
    }
    if CONSTANT_PARAMS.contains_key(key) {
        return ParameterClassification::Verifiable;
    }
    if EVENT_FIXED_PARAMS
        .get(event_name)
        .map(|m| m.contains_key(key))
        .unwrap_or(false)
    {
        return ParameterClassification::Verifiable;
    }
    if URL_FIXED_PARAMS
        .get(event_name)
        .map(|s| s.contains(key))
        .unwrap_or(false)
    {
        return ParameterClassification::Verifiable;
    }
    if USER_ACTION_PARAMS
        .get(event_name)
        .map(|s| s.contains(key))
        .unwrap_or(false)
    {
        return ParameterClassification::Dynamic;
    }
    if CONTENT_GROUP_BASED_PARAMS
        .get(event_name)
        .map(|m| m.contains_key(key))
        .unwrap_or(false)
    {
        return ParameterClassification::ContentGroup;
    }
    if PAGE_CONTEXT_PARAMS.contains(key) {
        return ParameterClassification::Dynamic;
    }
    ParameterClassification::Dynamic
}

/// Value-derivation step 1: global constants.
pub fn constant_value(key: &str) -> Option<Value> {
    CONSTANT_PARAMS.get(key).cloned()
}

/// Value-derivation step 2: per-event fixed values.
pub fn event_fixed_value(event_name: &str, key: &str) -> Option<Value> {
    EVENT_FIXED_PARAMS.get(event_name)?.get(key).cloned()
}

/// Value-derivation step 3: content-group table keyed by page type.
pub fn content_group_value(event_name: &str, key: &str, page_type: &PageType) -> Option<Value> {
    CONTENT_GROUP_BASED_PARAMS
        .get(event_name)?
        .get(key)?
        .get(page_type.as_str())
        .cloned()
}

/// The URL-extracted-parameter name that supplies `key`, if the key
/// isn't named identically in `PageContext::url_extracted_params`.
pub fn url_extraction_alias(key: &str) -> &str {
    URL_EXTRACTION_ALIASES.get(key).copied().unwrap_or(key)
}
