//! # NDOC
//! component: `gtm::container`
//! purpose: Parses the GTM container export JSON (§6) into the typed
//!   `ContainerModel`, then derives `eventPageMappings`, CSS-selector
//!   extraction, and custom-event-trigger detection.
//! invariants:
//!   - A tag with no `eventName` parameter is skipped with a warning, not
//!     an error.
//!   - A tag whose `firingTriggerId` references a missing trigger is
//!     reported (logged) but parsing continues — dangling references do
//!     not abort parsing.
//!   - Wholly malformed/missing `containerVersion` is a `CorruptContainer`
//!     (`OracleError::Config`).

use crate::errors::OracleError;
use crate::model::{
    EventName, EventPageMapping, Filter, FilterOperator, MappingSource, PageType, PageTypeSet,
    Tag, Trigger, TriggerType, Variable, VariableKind,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Deserialize)]
struct RawExport {
    #[serde(rename = "containerVersion")]
    container_version: RawContainerVersion,
}

#[derive(Debug, Deserialize, Default)]
struct RawContainerVersion {
    #[serde(default)]
    tag: Vec<RawTag>,
    #[serde(default)]
    trigger: Vec<RawTrigger>,
    #[serde(default)]
    variable: Vec<RawVariable>,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(rename = "type", default)]
    #[allow(dead_code)]
    param_type: Option<String>,
    key: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFilterGroup {
    #[serde(rename = "type", default)]
    op_type: Option<String>,
    #[serde(default)]
    parameter: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    #[serde(rename = "tagId")]
    tag_id: String,
    name: String,
    #[serde(default, rename = "firingTriggerId")]
    firing_trigger_id: Vec<String>,
    #[serde(default)]
    parameter: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
struct RawTrigger {
    #[serde(rename = "triggerId")]
    trigger_id: String,
    name: String,
    #[serde(rename = "type")]
    trigger_type: String,
    #[serde(default)]
    filter: Vec<RawFilterGroup>,
    #[serde(default)]
    parameter: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    #[serde(rename = "variableId")]
    #[allow(dead_code)]
    variable_id: String,
    name: String,
    #[serde(rename = "type")]
    var_type: String,
    #[serde(default)]
    parameter: Vec<RawParam>,
}

fn param_value<'a>(params: &'a [RawParam], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.value.as_deref())
}

fn parse_trigger_type(raw: &str) -> TriggerType {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).unwrap_or(TriggerType::Unknown)
}

fn parse_filter_operator(raw: &str) -> FilterOperator {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).unwrap_or(FilterOperator::Unknown)
}

fn parse_variable_kind(raw: &str) -> VariableKind {
    match raw {
        "v" => VariableKind::DataLayerVariable,
        "u" => VariableKind::UrlVariable,
        "jsm" | "j" => VariableKind::JavaScriptVariable,
        "c" => VariableKind::Constant,
        _ => VariableKind::Unknown,
    }
}

/// # NDOC
/// component: `gtm::container::ContainerModel`
/// purpose: Indexed, read-only view of a parsed container.
/// invariants:
///   - Built once at startup; all accessors are pure functions of the
///     stored maps.
#[derive(Debug, Clone)]
pub struct ContainerModel {
    pub triggers_by_id: HashMap<String, Trigger>,
    pub tags: Vec<Tag>,
    pub event_to_triggers: HashMap<EventName, Vec<String>>,
    pub variable_by_name: HashMap<String, Variable>,
}

/// Events whose GTM triggers don't actually constrain page type — the
/// engine owns this list and Stage 1 of the gating pipeline skips the GTM
/// mapping check for them (spec §4.4 Stage 1).
pub const GTM_INFERENCE_UNRELIABLE_EVENTS: &[&str] =
    &["add_to_cart", "begin_checkout", "remove_from_cart"];

fn is_gtm_internal_name(name: &str) -> bool {
    name.starts_with("{{") && name.ends_with("}}")
}

/// Parses a GTM container export document into a `ContainerModel`.
pub fn parse(raw_json: &str) -> Result<ContainerModel, OracleError> {
    let export: RawExport = serde_json::from_str(raw_json)
        .map_err(|e| OracleError::corrupt_container(format!("unparseable container JSON: {e}")))?;

    let mut triggers_by_id = HashMap::new();
    for rt in &export.container_version.trigger {
        let trigger_type = parse_trigger_type(&rt.trigger_type);
        let css_selector = match trigger_type {
            TriggerType::Click | TriggerType::LinkClick => {
                param_value(&rt.parameter, "selector").map(|s| s.to_string())
            }
            _ => None,
        };
        let custom_event_name = if trigger_type == TriggerType::CustomEvent {
            param_value(&rt.parameter, "customEventName").map(|s| s.to_string())
        } else {
            None
        };
        let filters = rt
            .filter
            .iter()
            .filter_map(|fg| {
                let variable = param_value(&fg.parameter, "arg0")?.to_string();
                let value = param_value(&fg.parameter, "arg1").unwrap_or("").to_string();
                let operator = parse_filter_operator(fg.op_type.as_deref().unwrap_or(""));
                Some(Filter {
                    variable,
                    operator,
                    value,
                })
            })
            .collect();

        triggers_by_id.insert(
            rt.trigger_id.clone(),
            Trigger {
                id: rt.trigger_id.clone(),
                name: rt.name.clone(),
                trigger_type,
                filters,
                css_selector,
                custom_event_name,
            },
        );
    }

    let mut tags = Vec::new();
    let mut event_to_triggers: HashMap<EventName, Vec<String>> = HashMap::new();
    for rtag in &export.container_version.tag {
        let event_name = match param_value(&rtag.parameter, "eventName") {
            Some(name) => name.to_string(),
            None => {
                log::warn!(
                    target: "gtm::container",
                    tag_id = rtag.tag_id.as_str();
                    "tag has no eventName parameter, skipping"
                );
                continue;
            }
        };

        for trigger_id in &rtag.firing_trigger_id {
            if !triggers_by_id.contains_key(trigger_id) {
                log::warn!(
                    target: "gtm::container",
                    tag_id = rtag.tag_id.as_str(),
                    trigger_id = trigger_id.as_str();
                    "tag references a trigger id not present in the container"
                );
            }
        }

        event_to_triggers
            .entry(event_name.clone())
            .or_default()
            .extend(rtag.firing_trigger_id.iter().cloned());

        tags.push(Tag {
            id: rtag.tag_id.clone(),
            name: rtag.name.clone(),
            event_name,
            firing_trigger_ids: rtag.firing_trigger_id.clone(),
        });
    }

    let mut variable_by_name = HashMap::new();
    for rv in &export.container_version.variable {
        variable_by_name.insert(
            rv.name.clone(),
            Variable {
                name: rv.name.clone(),
                kind: parse_variable_kind(&rv.var_type),
                expression: param_value(&rv.parameter, "javascript")
                    .or_else(|| param_value(&rv.parameter, "name"))
                    .map(|s| s.to_string()),
            },
        );
    }

    Ok(ContainerModel {
        triggers_by_id,
        tags,
        event_to_triggers,
        variable_by_name,
    })
}

impl ContainerModel {
    /// All event names the container defines a tag for, including
    /// syntactically-GTM-internal ones (`{{...}}`) — Stage 0 of the
    /// gating pipeline is responsible for rejecting those, not C1.
    pub fn event_names(&self) -> HashSet<EventName> {
        self.tags.iter().map(|t| t.event_name.clone()).collect()
    }

    pub fn triggers_for_event(&self, event_name: &str) -> Vec<&Trigger> {
        self.event_to_triggers
            .get(event_name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.triggers_by_id.get(id))
            .collect()
    }

    /// True if any of the event's triggers are of type `CUSTOM_EVENT` —
    /// those events are dispatched by dataLayer pushes regardless of
    /// selectors, so DOM selector verification is bypassed for them.
    pub fn has_custom_event_trigger(&self, event_name: &str) -> bool {
        self.triggers_for_event(event_name)
            .iter()
            .any(|t| t.trigger_type == TriggerType::CustomEvent)
    }

    /// Returns the first CSS selector among an event's CLICK/LINK_CLICK
    /// triggers, or `None` if it has none (including the case where all
    /// its triggers are CUSTOM_EVENT).
    pub fn extract_css_selector(&self, event_name: &str) -> Option<String> {
        self.triggers_for_event(event_name)
            .into_iter()
            .find_map(|t| t.css_selector.clone())
    }

    /// Confidence bands per spec §4.1: equality on a page-type variable
    /// scores highest, a URL-regex constraint scores 70, and mere
    /// presence with no page constraint scores 30 ("all pages").
    fn filter_confidence(filter: &Filter) -> (u8, Option<PageType>) {
        let variable_is_page_type = filter.variable.to_lowercase().contains("page type")
            || filter.variable.to_lowercase().contains("content group");
        let variable_is_url = filter.variable.to_lowercase().contains("url");

        if variable_is_page_type && filter.operator == FilterOperator::Equals {
            (90, Some(PageType::from(filter.value.clone())))
        } else if variable_is_url && filter.operator == FilterOperator::RegexMatch {
            (70, None)
        } else {
            (30, None)
        }
    }

    /// Builds the per-event `EventPageMapping` the gating engine's Stage 1
    /// consults. For the GTM-inference-unreliable list, callers should
    /// skip consulting this map (spec §4.4 Stage 1); it is still computed
    /// here since C1 must stay a pure function of its input.
    pub fn event_page_mappings(&self) -> HashMap<EventName, EventPageMapping> {
        let mut mappings = HashMap::new();
        for event_name in self.event_names() {
            if is_gtm_internal_name(&event_name) {
                continue;
            }
            let triggers = self.triggers_for_event(&event_name);
            let mut allowed = PageTypeSet::empty();
            let mut best_confidence: u8 = 30;
            let mut conditions = Vec::new();
            let mut saw_any_filter = false;

            for trigger in &triggers {
                for filter in &trigger.filters {
                    saw_any_filter = true;
                    let (confidence, page_type) = Self::filter_confidence(filter);
                    best_confidence = best_confidence.max(confidence);
                    if let Some(pt) = page_type {
                        if let PageTypeSet::Explicit(set) = &mut allowed {
                            set.insert(pt);
                        }
                    }
                    conditions.push(format!("{} {:?} {}", filter.variable, filter.operator, filter.value));
                }
            }

            if !saw_any_filter {
                allowed = PageTypeSet::All;
                best_confidence = 30;
            }

            mappings.insert(
                event_name.clone(),
                EventPageMapping {
                    event_name,
                    allowed_page_types: allowed,
                    source: MappingSource::Gtm,
                    confidence: best_confidence,
                    trigger_page_conditions: conditions,
                },
            );
        }
        mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_container() -> String {
        serde_json::json!({
            "containerVersion": {
                "tag": [
                    {
                        "tagId": "1",
                        "name": "GA4 - view_item",
                        "firingTriggerId": ["10"],
                        "parameter": [{"type": "template", "key": "eventName", "value": "view_item"}]
                    },
                    {
                        "tagId": "2",
                        "name": "GA4 - page_view",
                        "firingTriggerId": ["11"],
                        "parameter": [{"type": "template", "key": "eventName", "value": "page_view"}]
                    },
                    {
                        "tagId": "3",
                        "name": "no event name tag",
                        "firingTriggerId": [],
                        "parameter": []
                    },
                    {
                        "tagId": "4",
                        "name": "internal var masquerade",
                        "firingTriggerId": [],
                        "parameter": [{"type": "template", "key": "eventName", "value": "{{Some Var}}"}]
                    }
                ],
                "trigger": [
                    {
                        "triggerId": "10",
                        "name": "Product detail click",
                        "type": "CLICK",
                        "filter": [
                            {
                                "type": "EQUALS",
                                "parameter": [
                                    {"key": "arg0", "value": "{{Page Type}}"},
                                    {"key": "arg1", "value": "PRODUCT_DETAIL"}
                                ]
                            }
                        ],
                        "parameter": [{"key": "selector", "value": ".product-card"}]
                    },
                    {
                        "triggerId": "11",
                        "name": "All pages",
                        "type": "PAGEVIEW",
                        "filter": [],
                        "parameter": []
                    },
                    {
                        "triggerId": "99",
                        "name": "dangling ref",
                        "type": "CUSTOM_EVENT",
                        "filter": [],
                        "parameter": [{"key": "customEventName", "value": "qualified_visit"}]
                    }
                ],
                "variable": [
                    {"variableId": "1", "name": "Page Type", "type": "jsm", "parameter": []}
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn parses_tags_triggers_and_skips_tag_without_event_name() {
        let model = parse(&sample_container()).unwrap();
        let names = model.event_names();
        assert!(names.contains("view_item"));
        assert!(names.contains("page_view"));
        assert!(names.contains("{{Some Var}}"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn extracts_css_selector_for_click_trigger() {
        let model = parse(&sample_container()).unwrap();
        assert_eq!(
            model.extract_css_selector("view_item"),
            Some(".product-card".to_string())
        );
        assert_eq!(model.extract_css_selector("page_view"), None);
    }

    #[test]
    fn has_custom_event_trigger_is_false_for_click_bound_events() {
        let model = parse(&sample_container()).unwrap();
        assert!(!model.has_custom_event_trigger("view_item"));
    }

    #[test]
    fn dangling_trigger_reference_does_not_abort_parsing() {
        let with_dangling = serde_json::json!({
            "containerVersion": {
                "tag": [{
                    "tagId": "5",
                    "name": "dangling",
                    "firingTriggerId": ["missing-trigger"],
                    "parameter": [{"key": "eventName", "value": "select_item"}]
                }],
                "trigger": [],
                "variable": []
            }
        })
        .to_string();
        let model = parse(&with_dangling).expect("dangling refs must not abort parsing");
        assert!(model.event_names().contains("select_item"));
    }

    #[test]
    fn malformed_json_is_corrupt_container_error() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, OracleError::Config { .. }));
    }

    #[test]
    fn event_page_mapping_scores_page_type_equality_highest() {
        let model = parse(&sample_container()).unwrap();
        let mappings = model.event_page_mappings();
        let view_item = mappings.get("view_item").unwrap();
        assert_eq!(view_item.confidence, 90);
        assert!(view_item.allowed_page_types.contains(&PageType::ProductDetail));
    }

    #[test]
    fn event_with_no_filters_is_allowed_on_all_pages() {
        let model = parse(&sample_container()).unwrap();
        let mappings = model.event_page_mappings();
        let page_view = mappings.get("page_view").unwrap();
        assert!(matches!(page_view.allowed_page_types, PageTypeSet::All));
    }
}
