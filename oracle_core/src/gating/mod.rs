//! # NDOC
//! component: `gating`
//! purpose: C4, the event gating engine (spec §4.4) — the largest
//!   component. `decide()` runs the fixed Stage 0–11 pipeline over every
//!   event the container defines, producing `{canFire, noUI, blocked,
//!   autoCollected}`.
//! invariants:
//!   - Stages run in strict order; once an event is `Blocked`, later
//!     stages skip it (Testable Property 4, "monotone stages").
//!   - Every event name the container defines appears in exactly one of
//!     the three output buckets (Testable Property 1, "partition").

pub mod edge_cases;
pub mod linked_events;

use crate::browser::Page;
use crate::errors::DomQueryError;
use crate::gtm::container::{ContainerModel, GTM_INFERENCE_UNRELIABLE_EVENTS};
use crate::model::{
    EventClassification, EventDecision, EventName, PageContext, PageType, PageTypeSet,
    SelectorVerification, UiVerification,
};
use crate::spec_store::SpecStore;
use crate::spec_store::SiteConfigBundle;
use crate::vision::{extract_vision_response, Vision, VisionResponse};
use edge_cases::EdgeCaseVerdict;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

const DOM_TIMEOUT: Duration = Duration::from_secs(5);
const VISION_TIMEOUT: Duration = Duration::from_secs(60);

static GTM_VARIABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{\{.*\}\}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    CanFire,
    NoUi,
    Blocked,
}

#[derive(Debug, Clone)]
struct WorkingEvent {
    reason: String,
    trigger_info: Vec<String>,
    state: EventState,
    selector_verification: Option<SelectorVerification>,
    ui_verification: Option<UiVerification>,
    /// True once a selector/DOM check should be skipped, whether from a
    /// real GTM `CUSTOM_EVENT` trigger or a synthetic one injected at
    /// Stage 5/6/9/10.
    bypass_selector: bool,
    /// True once an earlier stage rendered an explicit verdict (admit or
    /// block) — Stage 4 only acts while this is still false.
    decided: bool,
    stage1_confidence: u8,
    auto_collected: bool,
}

impl WorkingEvent {
    fn fresh(trigger_info: Vec<String>) -> Self {
        WorkingEvent {
            reason: String::new(),
            trigger_info,
            state: EventState::CanFire,
            selector_verification: None,
            ui_verification: None,
            bypass_selector: false,
            decided: false,
            stage1_confidence: 0,
            auto_collected: false,
        }
    }

    fn synthetic_admitted(reason: impl Into<String>) -> Self {
        WorkingEvent {
            reason: reason.into(),
            trigger_info: Vec::new(),
            state: EventState::CanFire,
            selector_verification: None,
            ui_verification: None,
            bypass_selector: true,
            decided: true,
            stage1_confidence: 0,
            auto_collected: true,
        }
    }

    fn block(&mut self, reason: impl Into<String>) {
        self.state = EventState::Blocked;
        self.reason = reason.into();
        self.decided = true;
    }

    fn admit(&mut self, reason: impl Into<String>) {
        self.state = EventState::CanFire;
        self.reason = reason.into();
        self.decided = true;
    }
}

pub struct GatingResult {
    pub can_fire: Vec<EventDecision>,
    pub no_ui: Vec<EventDecision>,
    pub blocked: Vec<EventDecision>,
    pub auto_collected: Vec<EventName>,
}

fn is_inference_unreliable(site_config: &SiteConfigBundle, event_name: &str) -> bool {
    GTM_INFERENCE_UNRELIABLE_EVENTS.contains(&event_name)
        || site_config
            .gtm_inference_unreliable_events
            .iter()
            .any(|e| e == event_name)
}

fn is_brand_page(page_ctx: &PageContext) -> bool {
    matches!(
        page_ctx.page_type,
        PageType::BrandMain | PageType::BrandProductList | PageType::BrandEventList | PageType::BrandCustomEtc
    ) || page_ctx.url.contains("/display/brand/")
}

async fn dom_query_count(page: &dyn Page, selector: &str) -> Result<usize, DomQueryError> {
    match tokio::time::timeout(DOM_TIMEOUT, page.query_selector_all(selector)).await {
        Ok(Ok(matches)) => Ok(matches.len()),
        Ok(Err(message)) => Err(DomQueryError {
            stage: "gating",
            selector: selector.to_string(),
            message,
        }),
        Err(_) => Err(DomQueryError {
            stage: "gating",
            selector: selector.to_string(),
            message: "DOM query timed out".to_string(),
        }),
    }
}

fn stage0_syntax_filter(events: &mut BTreeMap<EventName, WorkingEvent>) {
    for (name, we) in events.iter_mut() {
        if GTM_VARIABLE_NAME.is_match(name) {
            we.block("blocked: GTM variable masquerading as an event name".to_string());
        }
    }
}

fn stage1_gtm_page_mapping(
    events: &mut BTreeMap<EventName, WorkingEvent>,
    container: &ContainerModel,
    site_config: &SiteConfigBundle,
    page_ctx: &PageContext,
) {
    let mappings = container.event_page_mappings();
    for (name, we) in events.iter_mut() {
        if we.state == EventState::Blocked || is_inference_unreliable(site_config, name) {
            continue;
        }
        let Some(mapping) = mappings.get(name) else {
            continue;
        };
        we.stage1_confidence = mapping.confidence;
        if mapping.confidence >= 75 {
            if mapping.allowed_page_types.contains(&page_ctx.page_type) {
                we.admit(format!("[GTM] allowed on {}", page_ctx.page_type));
            } else {
                we.block(format!("[GTM] allowed only on {:?}", mapping.allowed_page_types));
            }
        }
    }
}

async fn stage2_edge_case_registry(
    events: &mut BTreeMap<EventName, WorkingEvent>,
    rules: &[edge_cases::EdgeCaseRule],
    page_ctx: &PageContext,
    page: Option<&dyn Page>,
    has_live_performance_signal: bool,
) {
    for rule in rules {
        let Some(we) = events.get_mut(&rule.event_name) else {
            continue;
        };
        // No blocked-state short-circuit here: this registry overrides
        // Stage 1's verdict whenever it explicitly admits.
        let dom_has_required_element = match (&rule.required_element, page) {
            (Some(selector), Some(page)) => match dom_query_count(page, selector).await {
                Ok(count) => Some(count > 0),
                Err(_) => Some(false),
            },
            _ => None,
        };
        let verdict = edge_cases::evaluate(
            std::slice::from_ref(rule),
            &rule.event_name,
            page_ctx,
            dom_has_required_element,
            has_live_performance_signal,
        );
        match verdict {
            EdgeCaseVerdict::Blocked(reason) => we.block(reason),
            EdgeCaseVerdict::AdmitOverride(reason) => we.admit(reason),
            EdgeCaseVerdict::NoRule => {}
        }
    }
}

fn stage3_written_specification_filter(
    events: &mut BTreeMap<EventName, WorkingEvent>,
    spec_store: &SpecStore,
    page_ctx: &PageContext,
) {
    for (name, we) in events.iter_mut() {
        if we.state == EventState::Blocked {
            continue;
        }
        let Some(def) = spec_store.event_definition(name) else {
            continue;
        };
        let allowed = &def.allowed_page_types;
        let allowed_here = matches!(allowed, PageTypeSet::All) || allowed.contains(&page_ctx.page_type);
        if !allowed_here && we.stage1_confidence < 50 {
            we.block(format!("[guide] only {:?}", allowed));
        }
    }
}

fn stage4_ecommerce_fallback(events: &mut BTreeMap<EventName, WorkingEvent>, page_ctx: &PageContext) {
    for (name, we) in events.iter_mut() {
        if we.decided || we.state == EventState::Blocked {
            continue;
        }
        if !crate::spec_store::is_ecommerce_event(name) {
            continue;
        }
        let pages = crate::spec_store::ecommerce_fallback_page_types(name).unwrap_or_default();
        if pages.contains(&page_ctx.page_type) {
            we.admit("[fallback] ecommerce standard".to_string());
        } else {
            we.block(format!("[fallback] ecommerce standard excludes {}", page_ctx.page_type));
        }
    }
}

fn stage5_brand_event_swap(
    events: &mut BTreeMap<EventName, WorkingEvent>,
    site_config: &SiteConfigBundle,
    page_ctx: &PageContext,
) {
    if !is_brand_page(page_ctx) {
        return;
    }
    let Some(swap) = &site_config.brand_event_swap else {
        return;
    };
    if let Some(we) = events.get_mut(&swap.blocked_event) {
        we.block("[edge-case] brand page event swap: superseded by replacement event".to_string());
    }
    events
        .entry(swap.replacement_event.clone())
        .and_modify(|we| {
            we.bypass_selector = true;
            we.auto_collected = true;
            we.admit("[edge-case] brand page event swap replacement".to_string());
        })
        .or_insert_with(|| {
            WorkingEvent::synthetic_admitted("[edge-case] brand page event swap replacement (synthetic)".to_string())
        });
}

async fn stage6_video_auto_inclusion(events: &mut BTreeMap<EventName, WorkingEvent>, page: Option<&dyn Page>) {
    let Some(page) = page else {
        return;
    };
    let has_youtube = dom_query_count(page, "iframe[src*=\"youtube\"]")
        .await
        .map(|count| count > 0)
        .unwrap_or(false);
    if !has_youtube {
        return;
    }
    for event_name in ["video_start", "video_progress"] {
        events
            .entry(event_name.to_string())
            .and_modify(|we| {
                we.bypass_selector = true;
                we.auto_collected = true;
                if we.state == EventState::Blocked {
                    we.admit("[auto] YouTube iframe present".to_string());
                }
            })
            .or_insert_with(|| WorkingEvent::synthetic_admitted("[auto] YouTube iframe present (synthetic)".to_string()));
    }
}

async fn stage7_selector_verification(
    events: &mut BTreeMap<EventName, WorkingEvent>,
    container: &ContainerModel,
    page: Option<&dyn Page>,
) {
    for (name, we) in events.iter_mut() {
        if we.state == EventState::Blocked || we.bypass_selector || container.has_custom_event_trigger(name) {
            continue;
        }
        let Some(selector) = container.extract_css_selector(name) else {
            continue;
        };
        let Some(page) = page else {
            continue;
        };
        match dom_query_count(page, &selector).await {
            Ok(count) if count > 0 => {
                we.selector_verification = Some(SelectorVerification { selector, matched: true });
            }
            _ => {
                we.selector_verification = Some(SelectorVerification {
                    selector: selector.clone(),
                    matched: false,
                });
                we.block(format!("[Selector] element not found: {}", selector));
            }
        }
    }
}

async fn stage8_ui_verification(
    events: &mut BTreeMap<EventName, WorkingEvent>,
    spec_store: &SpecStore,
    page_ctx: &PageContext,
    vision: Option<&dyn Vision>,
    screenshot: Option<&[u8]>,
) {
    let Some(vision) = vision else {
        return;
    };
    let Some(screenshot) = screenshot else {
        return;
    };

    let candidates: Vec<EventName> = events
        .iter()
        .filter_map(|(name, we)| {
            let is_auto_fire = spec_store
                .event_definition(name)
                .map(|d| d.auto_fire)
                .unwrap_or(false);
            if we.state != EventState::Blocked && !is_auto_fire {
                Some(name.clone())
            } else {
                None
            }
        })
        .collect();

    for (name, we) in events.iter_mut() {
        if spec_store.event_definition(name).map(|d| d.auto_fire).unwrap_or(false) && we.state != EventState::Blocked {
            let confidence = 90;
            we.ui_verification = Some(UiVerification {
                has_ui: true,
                reason: "autoFire bypass".to_string(),
                confidence,
            });
        }
    }

    if candidates.is_empty() {
        return;
    }

    let prompt = build_vision_prompt(page_ctx, &candidates, spec_store);
    let outcome = tokio::time::timeout(VISION_TIMEOUT, vision.analyse(screenshot, &prompt)).await;

    let parsed: Result<VisionResponse, String> = match outcome {
        Ok(Ok(raw)) => extract_vision_response(&raw).ok_or_else(|| "unparseable vision response".to_string()),
        Ok(Err(message)) => Err(message),
        Err(_) => Err("vision call timed out".to_string()),
    };

    match parsed {
        Ok(response) => {
            for name in &candidates {
                let we = events.get_mut(name).expect("candidate came from events map");
                match response.verification_results.iter().find(|r| &r.event_name == name) {
                    Some(result) if result.has_ui => {
                        we.ui_verification = Some(UiVerification {
                            has_ui: true,
                            reason: result.reason.clone(),
                            confidence: result.confidence,
                        });
                    }
                    Some(result) => {
                        we.state = EventState::NoUi;
                        we.ui_verification = Some(UiVerification {
                            has_ui: false,
                            reason: result.reason.clone(),
                            confidence: result.confidence,
                        });
                    }
                    None => {
                        we.state = EventState::NoUi;
                        we.ui_verification = Some(UiVerification {
                            has_ui: false,
                            reason: "[vision] event not addressed in response".to_string(),
                            confidence: 0,
                        });
                    }
                }
            }
        }
        Err(message) => {
            for name in &candidates {
                let we = events.get_mut(name).expect("candidate came from events map");
                let requires_user_action = spec_store
                    .event_definition(name)
                    .map(|d| d.requires_user_action)
                    .unwrap_or(false);
                we.state = EventState::NoUi;
                we.ui_verification = Some(UiVerification {
                    has_ui: false,
                    reason: format!("[vision] {}", message),
                    confidence: if requires_user_action { 30 } else { 0 },
                });
            }
        }
    }
}

fn build_vision_prompt(page_ctx: &PageContext, candidates: &[EventName], spec_store: &SpecStore) -> String {
    let mut prompt = format!("Page type: {}\n\nVerify the following events:\n", page_ctx.page_type);
    for name in candidates {
        let guide = spec_store
            .event_definition(name)
            .and_then(|d| d.required_ui.clone())
            .unwrap_or_else(|| "(no required UI noted)".to_string());
        prompt.push_str(&format!("- {}: required UI = {}\n", name, guide));
    }
    prompt
}

fn stage9_linked_event_propagation(events: &mut BTreeMap<EventName, WorkingEvent>, rules: &[linked_events::LinkedEventRule]) {
    let primaries: Vec<EventName> = events
        .iter()
        .filter_map(|(name, we)| {
            let has_confirmed_ui = we.ui_verification.as_ref().map(|v| v.has_ui).unwrap_or(false);
            has_confirmed_ui.then(|| name.clone())
        })
        .collect();

    for primary in &primaries {
        for rule in linked_events::rules_for_primary(rules, primary) {
            if let Some(linked_we) = events.get_mut(&rule.linked) {
                if linked_we.state == EventState::NoUi {
                    linked_we.state = EventState::CanFire;
                    linked_we.reason = format!("[linked] promoted via {}: {}", primary, rule.reason);
                    linked_we.ui_verification = Some(UiVerification {
                        has_ui: true,
                        reason: rule.reason.clone(),
                        confidence: 70,
                    });
                }
            }
        }
    }
}

fn stage10_forced_auto_inclusion(events: &mut BTreeMap<EventName, WorkingEvent>, forced: &[String]) {
    for event_name in forced {
        events
            .entry(event_name.clone())
            .and_modify(|we| {
                we.bypass_selector = true;
                we.auto_collected = true;
                we.admit("[auto] forced inclusion".to_string());
            })
            .or_insert_with(|| WorkingEvent::synthetic_admitted("[auto] forced inclusion".to_string()));
    }
}

fn stage11_contextual_vision_inference(events: &mut BTreeMap<EventName, WorkingEvent>, page_ctx: &PageContext) {
    if page_ctx.page_type != PageType::ProductDetail {
        return;
    }
    let begin_checkout_admitted = events
        .get("begin_checkout")
        .map(|we| we.state == EventState::CanFire)
        .unwrap_or(false);
    if !begin_checkout_admitted {
        return;
    }
    if let Some(add_to_cart) = events.get_mut("add_to_cart") {
        if add_to_cart.state == EventState::NoUi {
            add_to_cart.state = EventState::CanFire;
            add_to_cart.reason = "the buy button likely opens a cart drawer".to_string();
            add_to_cart.ui_verification = Some(UiVerification {
                has_ui: true,
                reason: "inferred from begin_checkout visibility".to_string(),
                confidence: 65,
            });
        }
    }
}

/// Runs the full Stage 0–11 pipeline for one page and returns the
/// partitioned event sets.
pub async fn decide(
    container: &ContainerModel,
    spec_store: &SpecStore,
    site_config: &SiteConfigBundle,
    page_ctx: &PageContext,
    page: Option<&dyn Page>,
    vision: Option<&dyn Vision>,
    screenshot: Option<&[u8]>,
) -> GatingResult {
    let mut events: BTreeMap<EventName, WorkingEvent> = container
        .event_names()
        .into_iter()
        .map(|name| {
            let trigger_info = container
                .triggers_for_event(&name)
                .iter()
                .map(|t| t.name.clone())
                .collect();
            (name, WorkingEvent::fresh(trigger_info))
        })
        .collect();

    stage0_syntax_filter(&mut events);
    stage1_gtm_page_mapping(&mut events, container, site_config, page_ctx);
    stage2_edge_case_registry(&mut events, &site_config.edge_cases, page_ctx, page, false).await;
    stage3_written_specification_filter(&mut events, spec_store, page_ctx);
    stage4_ecommerce_fallback(&mut events, page_ctx);
    stage5_brand_event_swap(&mut events, site_config, page_ctx);
    stage6_video_auto_inclusion(&mut events, page).await;
    stage7_selector_verification(&mut events, container, page).await;
    stage8_ui_verification(&mut events, spec_store, page_ctx, vision, screenshot).await;
    stage9_linked_event_propagation(&mut events, &site_config.linked_event_rules);
    stage10_forced_auto_inclusion(&mut events, &site_config.forced_auto_inclusion_events);
    stage11_contextual_vision_inference(&mut events, page_ctx);

    for (name, we) in &events {
        let classification = match we.state {
            EventState::CanFire => "CAN_FIRE",
            EventState::NoUi => "NO_UI",
            EventState::Blocked => "BLOCKED",
        };
        crate::logging::log_stage_decision("gating::decide", name, classification, &we.reason);
    }

    let mut result = GatingResult {
        can_fire: Vec::new(),
        no_ui: Vec::new(),
        blocked: Vec::new(),
        auto_collected: Vec::new(),
    };

    for (name, we) in events {
        if we.auto_collected {
            result.auto_collected.push(name.clone());
        }
        let decision = EventDecision {
            event_name: name,
            classification: match we.state {
                EventState::CanFire => EventClassification::CanFire,
                EventState::NoUi => EventClassification::NoUi,
                EventState::Blocked => EventClassification::Blocked,
            },
            reason: we.reason,
            trigger_info: we.trigger_info,
            selector_verification: we.selector_verification,
            ui_verification: we.ui_verification,
        };
        match decision.classification {
            EventClassification::CanFire => result.can_fire.push(decision),
            EventClassification::NoUi => result.no_ui.push(decision),
            EventClassification::Blocked => result.blocked.push(decision),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FakePage;
    use crate::gtm::container as gtm_container;
    use crate::page_context::{signals::NoDomSignals, RuntimeSignalInputs};
    use crate::spec_store::{BrandEventSwap, SiteConfigBundle, SpecStore};
    use crate::vision::FakeVision;
    use proptest::prelude::*;

    fn page_context_for(url: &str, page_type: PageType) -> PageContext {
        let mut ctx = crate::page_context::detect(url, &RuntimeSignalInputs::default(), &NoDomSignals);
        ctx.page_type = page_type;
        ctx
    }

    fn container_with(tags_and_triggers: serde_json::Value) -> gtm_container::ContainerModel {
        gtm_container::parse(&tags_and_triggers.to_string()).unwrap()
    }

    fn empty_spec_store() -> SpecStore {
        SpecStore::new("Event Name: page_view\nAllowed Page Types: ALL\n", "ga4Key,devGuideVar,example,category,eventName,isCustomDimension\n", SiteConfigBundle::default()).unwrap()
    }

    #[tokio::test]
    async fn syntax_filter_blocks_gtm_internal_variable_names() {
        let container = container_with(serde_json::json!({
            "containerVersion": {
                "tag": [{
                    "tagId": "1",
                    "name": "weird",
                    "firingTriggerId": [],
                    "parameter": [{"key": "eventName", "value": "{{Some Var}}"}]
                }],
                "trigger": [],
                "variable": []
            }
        }));
        let spec_store = empty_spec_store();
        let site_config = SiteConfigBundle::default();
        let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);

        let result = decide(&container, &spec_store, &site_config, &page_ctx, None, None, None).await;
        assert_eq!(result.blocked.len(), 1);
        assert!(result.blocked[0].reason.contains("GTM variable"));
    }

    #[tokio::test]
    async fn edge_case_registry_overrides_a_stage1_gtm_block() {
        let container = container_with(serde_json::json!({
            "containerVersion": {
                "tag": [{
                    "tagId": "1",
                    "name": "view_item tag",
                    "firingTriggerId": ["10"],
                    "parameter": [{"key": "eventName", "value": "view_item"}]
                }],
                "trigger": [{
                    "triggerId": "10",
                    "name": "Product detail click",
                    "type": "CLICK",
                    "filter": [{
                        "type": "EQUALS",
                        "parameter": [
                            {"key": "arg0", "value": "{{Page Type}}"},
                            {"key": "arg1", "value": "PRODUCT_DETAIL"}
                        ]
                    }],
                    "parameter": []
                }],
                "variable": []
            }
        }));
        let spec_store = empty_spec_store();
        let mut site_config = SiteConfigBundle::default();
        site_config.edge_cases.push(edge_cases::EdgeCaseRule {
            event_name: "view_item".to_string(),
            condition: "manual_override".to_string(),
            description: "view_item also fires from the brand minisite".to_string(),
            required_element: None,
            allowed_page_types: Some(vec![PageType::Main]),
            allowed_url_patterns: vec![],
        });
        let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);

        let result = decide(&container, &spec_store, &site_config, &page_ctx, None, None, None).await;
        assert!(
            result.can_fire.iter().any(|d| d.event_name == "view_item"),
            "edge-case admit must override Stage 1's GTM block"
        );
        assert!(!result.blocked.iter().any(|d| d.event_name == "view_item"));
    }

    #[tokio::test]
    async fn partition_covers_every_defined_event_exactly_once() {
        let container = container_with(serde_json::json!({
            "containerVersion": {
                "tag": [
                    {"tagId": "1", "name": "a", "firingTriggerId": [], "parameter": [{"key": "eventName", "value": "view_item"}]},
                    {"tagId": "2", "name": "b", "firingTriggerId": [], "parameter": [{"key": "eventName", "value": "purchase"}]}
                ],
                "trigger": [],
                "variable": []
            }
        }));
        let spec_store = empty_spec_store();
        let site_config = SiteConfigBundle::default();
        let page_ctx = page_context_for("https://shop.example.com/prd/detail/1", PageType::ProductDetail);

        let result = decide(&container, &spec_store, &site_config, &page_ctx, None, None, None).await;
        let total = result.can_fire.len() + result.no_ui.len() + result.blocked.len();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn selector_bypass_for_custom_event_trigger_ignores_dom() {
        let container = container_with(serde_json::json!({
            "containerVersion": {
                "tag": [{
                    "tagId": "1",
                    "name": "qv",
                    "firingTriggerId": ["10"],
                    "parameter": [{"key": "eventName", "value": "qualified_visit"}]
                }],
                "trigger": [{
                    "triggerId": "10",
                    "name": "custom",
                    "type": "CUSTOM_EVENT",
                    "filter": [],
                    "parameter": [{"key": "customEventName", "value": "qualified_visit"}]
                }],
                "variable": []
            }
        }));
        let spec_store = empty_spec_store();
        let site_config = SiteConfigBundle::default();
        let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);
        let page = FakePage::new();

        let result = decide(&container, &spec_store, &site_config, &page_ctx, Some(&page), None, None).await;
        assert!(result.can_fire.iter().any(|d| d.event_name == "qualified_visit"));
    }

    #[tokio::test]
    async fn brand_page_swap_replaces_select_item_with_brand_product_click() {
        let container = container_with(serde_json::json!({
            "containerVersion": {
                "tag": [{
                    "tagId": "1",
                    "name": "select",
                    "firingTriggerId": ["10"],
                    "parameter": [{"key": "eventName", "value": "select_item"}]
                }],
                "trigger": [{
                    "triggerId": "10",
                    "name": "card click",
                    "type": "CLICK",
                    "filter": [],
                    "parameter": [{"key": "selector", "value": ".brand-card"}]
                }],
                "variable": []
            }
        }));
        let spec_store = empty_spec_store();
        let mut site_config = SiteConfigBundle::default();
        site_config.brand_event_swap = Some(BrandEventSwap {
            blocked_event: "select_item".to_string(),
            replacement_event: "brand_product_click".to_string(),
        });
        let page_ctx = page_context_for("https://shop.example.com/display/brand/detail", PageType::BrandMain);
        let page = FakePage::new();

        let result = decide(&container, &spec_store, &site_config, &page_ctx, Some(&page), None, None).await;
        assert!(result.blocked.iter().any(|d| d.event_name == "select_item"));
        assert!(result.can_fire.iter().any(|d| d.event_name == "brand_product_click"));
    }

    #[tokio::test]
    async fn vision_failure_degrades_by_required_ui_policy() {
        let container = container_with(serde_json::json!({
            "containerVersion": {
                "tag": [
                    {"tagId": "1", "name": "pv", "firingTriggerId": [], "parameter": [{"key": "eventName", "value": "page_view"}]},
                    {"tagId": "2", "name": "atc", "firingTriggerId": [], "parameter": [{"key": "eventName", "value": "add_to_cart"}]}
                ],
                "trigger": [],
                "variable": []
            }
        }));
        let spec_store = SpecStore::new(
            "Event Name: page_view\nAllowed Page Types: ALL\nUser Action: autoFire\n\nEvent Name: add_to_cart\nAllowed Page Types: ALL\nUser Action: requiresUserAction\n",
            "ga4Key,devGuideVar,example,category,eventName,isCustomDimension\n",
            SiteConfigBundle::default(),
        ).unwrap();
        let site_config = SiteConfigBundle::default();
        let page_ctx = page_context_for("https://shop.example.com/prd/detail/1", PageType::ProductDetail);
        let vision = FakeVision::failing();

        let result = decide(
            &container,
            &spec_store,
            &site_config,
            &page_ctx,
            None,
            Some(&vision),
            Some(&[0u8; 4]),
        )
        .await;

        assert!(result.can_fire.iter().any(|d| d.event_name == "page_view"));
        let atc = result
            .no_ui
            .iter()
            .find(|d| d.event_name == "add_to_cart")
            .expect("add_to_cart should degrade to noUI on vision failure");
        assert_eq!(atc.ui_verification.as_ref().unwrap().confidence, 30);
    }

    fn container_for_event_names(names: &[String]) -> gtm_container::ContainerModel {
        let tags: Vec<serde_json::Value> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                serde_json::json!({
                    "tagId": format!("t{i}"),
                    "name": name,
                    "firingTriggerId": [],
                    "parameter": [{"key": "eventName", "value": name}]
                })
            })
            .collect();
        container_with(serde_json::json!({
            "containerVersion": { "tag": tags, "trigger": [], "variable": [] }
        }))
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Testable Property 1 ("partition"): every event the container
        /// defines ends up in exactly one of canFire/noUI/blocked.
        #[test]
        fn partition_prop(names in prop::collection::btree_set("[a-z]{3,8}", 1..6)) {
            let names: Vec<String> = names.into_iter().collect();
            let container = container_for_event_names(&names);
            let spec_store = empty_spec_store();
            let site_config = SiteConfigBundle::default();
            let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);

            let result = block_on(decide(&container, &spec_store, &site_config, &page_ctx, None, None, None));

            let total = result.can_fire.len() + result.no_ui.len() + result.blocked.len();
            prop_assert_eq!(total, names.len());

            let mut seen = std::collections::BTreeSet::new();
            for d in result.can_fire.iter().chain(result.no_ui.iter()).chain(result.blocked.iter()) {
                prop_assert!(seen.insert(d.event_name.clone()), "event counted in more than one bucket");
            }
        }

        /// Testable Property 3 ("determinism"): two analyses of the same
        /// URL/container/spec/DOM/vision inputs produce identical output.
        #[test]
        fn determinism_prop(names in prop::collection::btree_set("[a-z]{3,8}", 1..5)) {
            let names: Vec<String> = names.into_iter().collect();
            let container = container_for_event_names(&names);
            let spec_store = empty_spec_store();
            let site_config = SiteConfigBundle::default();
            let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);

            let first = block_on(decide(&container, &spec_store, &site_config, &page_ctx, None, None, None));
            let second = block_on(decide(&container, &spec_store, &site_config, &page_ctx, None, None, None));

            let summarize = |r: &GatingResult| -> Vec<(String, &'static str, String)> {
                r.can_fire.iter().map(|d| (d.event_name.clone(), "CAN_FIRE", d.reason.clone()))
                    .chain(r.no_ui.iter().map(|d| (d.event_name.clone(), "NO_UI", d.reason.clone())))
                    .chain(r.blocked.iter().map(|d| (d.event_name.clone(), "BLOCKED", d.reason.clone())))
                    .collect()
            };
            prop_assert_eq!(summarize(&first), summarize(&second));
        }

        /// Testable Property 4 ("monotone stages"): an event blocked at
        /// Stage 0 (GTM-variable syntax) stays blocked, independent of
        /// what a later stage's own spec-store configuration would
        /// otherwise decide for it.
        #[test]
        fn gtm_variable_stays_blocked_prop(ident in "[A-Za-z][A-Za-z0-9_]{2,10}") {
            let var_name = format!("{{{{{ident}}}}}");
            let container = container_with(serde_json::json!({
                "containerVersion": {
                    "tag": [{
                        "tagId": "1",
                        "name": "weird",
                        "firingTriggerId": [],
                        "parameter": [{"key": "eventName", "value": var_name}]
                    }],
                    "trigger": [],
                    "variable": []
                }
            }));
            let spec_store = SpecStore::new(
                "Event Name: unrelated_event\nAllowed Page Types: ALL\nUser Action: autoFire\n",
                "ga4Key,devGuideVar,example,category,eventName,isCustomDimension\n",
                SiteConfigBundle::default(),
            ).unwrap();
            let site_config = SiteConfigBundle::default();
            let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);

            let result = block_on(decide(&container, &spec_store, &site_config, &page_ctx, None, None, None));

            prop_assert!(result.blocked.iter().any(|d| d.event_name == var_name));
            prop_assert!(!result.can_fire.iter().any(|d| d.event_name == var_name));
            prop_assert!(!result.no_ui.iter().any(|d| d.event_name == var_name));
        }

        /// Testable Property 5 ("selector bypass"): an event whose only
        /// trigger is a `CUSTOM_EVENT` trigger has a verdict independent
        /// of whatever selectors Stage 7 would otherwise observe in DOM.
        #[test]
        fn custom_event_trigger_ignores_dom_match_count_prop(match_count in 0usize..5) {
            let container = container_with(serde_json::json!({
                "containerVersion": {
                    "tag": [{
                        "tagId": "1",
                        "name": "qv",
                        "firingTriggerId": ["10"],
                        "parameter": [{"key": "eventName", "value": "qualified_visit"}]
                    }],
                    "trigger": [{
                        "triggerId": "10",
                        "name": "custom",
                        "type": "CUSTOM_EVENT",
                        "filter": [],
                        "parameter": [{"key": "customEventName", "value": "qualified_visit"}]
                    }],
                    "variable": []
                }
            }));
            let spec_store = empty_spec_store();
            let site_config = SiteConfigBundle::default();
            let page_ctx = page_context_for("https://shop.example.com/display/main", PageType::Main);
            let page = FakePage::new().with_selector_match("button.buy", match_count);

            let result = block_on(decide(&container, &spec_store, &site_config, &page_ctx, Some(&page), None, None));

            prop_assert!(result.can_fire.iter().any(|d| d.event_name == "qualified_visit"));
        }
    }
}
