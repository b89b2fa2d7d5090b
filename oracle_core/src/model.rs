//! Shared data model for the GTM container, the page-type detector, the
//! event gating engine, and the parameter predictor.
//!
//! # NDOC
//! component: `model`
//! purpose: Plain-data types shared across C1–C5; no behavior lives here.
//! invariants:
//!   - All types are `Serialize`/`Deserialize` so they can cross the CLI's
//!     JSON boundary unchanged.
//!   - `PageType::Other(String)` is the catch-all for site-specific labels;
//!     unknown strings from configuration must resolve here, never panic.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lowercase GA4/GTM event identifier, e.g. `view_item`.
pub type EventName = String;

/// Closed page-type enum plus an open `Other` extension point.
///
/// # NDOC
/// component: `model::PageType`
/// purpose: Coarse page classification used to gate events.
/// invariants:
///   - Deserializing an unrecognized string yields `Other(string)`, which
///     callers must treat as equivalent to `OTHERS` for gating purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageType {
    Main,
    ProductDetail,
    ProductList,
    SearchResult,
    Cart,
    Order,
    OrderComplete,
    EventDetail,
    EventList,
    BrandMain,
    BrandProductList,
    BrandEventList,
    BrandCustomEtc,
    LiveDetail,
    LiveList,
    My,
    History,
    Others,
    /// Site-specific extension the closed set doesn't name.
    Other(String),
}

impl PageType {
    pub fn as_str(&self) -> &str {
        match self {
            PageType::Main => "MAIN",
            PageType::ProductDetail => "PRODUCT_DETAIL",
            PageType::ProductList => "PRODUCT_LIST",
            PageType::SearchResult => "SEARCH_RESULT",
            PageType::Cart => "CART",
            PageType::Order => "ORDER",
            PageType::OrderComplete => "ORDER_COMPLETE",
            PageType::EventDetail => "EVENT_DETAIL",
            PageType::EventList => "EVENT_LIST",
            PageType::BrandMain => "BRAND_MAIN",
            PageType::BrandProductList => "BRAND_PRODUCT_LIST",
            PageType::BrandEventList => "BRAND_EVENT_LIST",
            PageType::BrandCustomEtc => "BRAND_CUSTOM_ETC",
            PageType::LiveDetail => "LIVE_DETAIL",
            PageType::LiveList => "LIVE_LIST",
            PageType::My => "MY",
            PageType::History => "HISTORY",
            PageType::Others => "OTHERS",
            PageType::Other(s) => s.as_str(),
        }
    }

    /// Any page-type string the engine doesn't recognize collapses to
    /// `OTHERS` for gating purposes, per spec: "the engine must treat
    /// unknown labels as OTHERS".
    pub fn is_others(&self) -> bool {
        matches!(self, PageType::Others) || matches!(self, PageType::Other(_))
    }
}

impl From<String> for PageType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "MAIN" => PageType::Main,
            "PRODUCT_DETAIL" => PageType::ProductDetail,
            "PRODUCT_LIST" => PageType::ProductList,
            "SEARCH_RESULT" => PageType::SearchResult,
            "CART" => PageType::Cart,
            "ORDER" => PageType::Order,
            "ORDER_COMPLETE" => PageType::OrderComplete,
            "EVENT_DETAIL" => PageType::EventDetail,
            "EVENT_LIST" => PageType::EventList,
            "BRAND_MAIN" => PageType::BrandMain,
            "BRAND_PRODUCT_LIST" => PageType::BrandProductList,
            "BRAND_EVENT_LIST" => PageType::BrandEventList,
            "BRAND_CUSTOM_ETC" => PageType::BrandCustomEtc,
            "LIVE_DETAIL" => PageType::LiveDetail,
            "LIVE_LIST" => PageType::LiveList,
            "MY" => PageType::My,
            "HISTORY" => PageType::History,
            "OTHERS" => PageType::Others,
            other => PageType::Other(other.to_string()),
        }
    }
}

impl From<PageType> for String {
    fn from(p: PageType) -> Self {
        p.as_str().to_string()
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Either every page type or an explicit subset — used wherever the spec
/// says "PageType[] | ALL".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageTypeSet {
    All,
    Explicit(HashSet<PageType>),
}

impl PageTypeSet {
    pub fn contains(&self, page_type: &PageType) -> bool {
        match self {
            PageTypeSet::All => true,
            PageTypeSet::Explicit(set) => set.contains(page_type),
        }
    }

    pub fn empty() -> Self {
        PageTypeSet::Explicit(HashSet::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PageTypeSet::Explicit(set) if set.is_empty())
    }

    pub fn union(&mut self, other: &PageTypeSet) {
        match (self, other) {
            (this @ PageTypeSet::All, _) => {
                let _ = this;
            }
            (this, PageTypeSet::All) => *this = PageTypeSet::All,
            (PageTypeSet::Explicit(a), PageTypeSet::Explicit(b)) => {
                a.extend(b.iter().cloned());
            }
        }
    }
}

/// # NDOC
/// component: `model::TriggerType`
/// purpose: Closed enum of GTM trigger kinds with an `Unknown` sink, per
///   Design Note "prefer a small closed enum over a deep class hierarchy".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    Click,
    LinkClick,
    JustLinks,
    AllElements,
    CustomEvent,
    Pageview,
    DomReady,
    HistoryChange,
    ScrollDepth,
    Visibility,
    Timer,
    YoutubeVideo,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equals,
    Contains,
    RegexMatch,
    GreaterThan,
    LessThan,
    #[serde(other)]
    Unknown,
}

/// One predicate inside a trigger's filter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub variable: String,
    pub operator: FilterOperator,
    pub value: String,
}

/// # NDOC
/// component: `model::Trigger`
/// purpose: A GTM trigger — a predicate over page signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    pub trigger_type: TriggerType,
    pub filters: Vec<Filter>,
    pub css_selector: Option<String>,
    pub custom_event_name: Option<String>,
}

/// A tag binds an event name to a set of firing triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub event_name: EventName,
    pub firing_trigger_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    DataLayerVariable,
    UrlVariable,
    JavaScriptVariable,
    Constant,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSource {
    Gtm,
    Guide,
    Ga4Standard,
    EdgeCase,
}

/// # NDOC
/// component: `model::EventPageMapping`
/// purpose: Per-event allowed-page knowledge from one source, with an
///   ordinal confidence used to resolve cross-source disagreement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPageMapping {
    pub event_name: EventName,
    pub allowed_page_types: PageTypeSet,
    pub source: MappingSource,
    pub confidence: u8,
    pub trigger_page_conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterCategory {
    Common,
    Event,
    User,
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub ga4_key: String,
    pub dev_guide_var: String,
    pub category: ParameterCategory,
    pub is_custom_dimension: bool,
    pub description: String,
    pub value_type: ValueType,
    pub extraction_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub total: usize,
    pub standard: usize,
    pub custom: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParameterConfig {
    pub event_name: EventName,
    pub parameters: Vec<ParameterDefinition>,
    pub has_items: bool,
    pub summary: ParameterSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTypeSignal {
    pub source: String,
    pub page_type: PageType,
    pub confidence: u8,
    pub detail: String,
}

/// # NDOC
/// component: `model::PageContext`
/// purpose: The fused, per-request view of "what page is this" plus
///   URL-derived parameters, handed to C4 and C5.
/// invariants:
///   - Exactly one `page_type` is reported; `has_conflict` records whether
///     competing signals were close enough to be ambiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub url: String,
    pub pathname: String,
    pub hostname: String,
    pub page_type: PageType,
    pub page_type_confidence: u8,
    pub page_type_signals: Vec<PageTypeSignal>,
    pub has_conflict: bool,
    pub query_params: HashMap<String, String>,
    pub url_extracted_params: HashMap<String, String>,
    pub is_logged_in: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventClassification {
    CanFire,
    NoUi,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorVerification {
    pub selector: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiVerification {
    pub has_ui: bool,
    pub reason: String,
    pub confidence: u8,
}

/// # NDOC
/// component: `model::EventDecision`
/// purpose: The gating verdict for one event on one page, with enough
///   trail to explain *why*.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDecision {
    pub event_name: EventName,
    pub classification: EventClassification,
    pub reason: String,
    pub trigger_info: Vec<String>,
    pub selector_verification: Option<SelectorVerification>,
    pub ui_verification: Option<UiVerification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Skip,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterClassification {
    Verifiable,
    ContentGroup,
    Dynamic,
}

/// # NDOC
/// component: `model::ParameterPrediction`
/// purpose: One predicted parameter value plus its source and confidence.
/// invariants:
///   - `classification == Verifiable` implies the value is stable at a
///     canonical page location and may be diffed against captured data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterPrediction {
    pub key: String,
    pub predicted_value: serde_json::Value,
    pub source: String,
    pub confidence: Confidence,
    pub classification: ParameterClassification,
    pub notes: Option<String>,
}

/// Development-guide-derived knowledge about one event, independent of
/// the GTM container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedEventDefinition {
    pub event_name: EventName,
    pub required: bool,
    pub firing_condition: String,
    pub required_ui: Option<String>,
    pub user_action_type: Option<String>,
    pub allowed_page_types: PageTypeSet,
    pub auto_fire: bool,
    pub requires_user_action: bool,
}

/// Per-host site configuration bundle (§4.2 source 4 / §6 "Site
/// configuration").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteConfig {
    pub host: String,
    pub site_name: String,
    pub event_aliases: HashMap<String, String>,
    pub dom_attribute_prefix: String,
    pub variable_naming_convention: String,
}

/// Parameters tagged `FUNNEL_TRACKED` in §4.5.
pub const FUNNEL_TRACKED_PARAMS: &[&str] = &["item_id", "item_name", "item_brand", "price"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunnelSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelConsistencyFinding {
    pub parameter: String,
    pub severity: FunnelSeverity,
    pub events: Vec<EventName>,
    pub observed_values: Vec<serde_json::Value>,
}
