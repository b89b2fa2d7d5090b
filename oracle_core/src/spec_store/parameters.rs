//! # NDOC
//! component: `spec_store::parameters`
//! purpose: Loads the typed parameter mapping table (§6: one row per GA4
//!   parameter, per event) into per-event `EventParameterConfig`s plus the
//!   shared common/user parameter lists.

use crate::errors::OracleError;
use crate::model::{
    EventName, EventParameterConfig, ParameterCategory, ParameterDefinition, ParameterSummary,
    ValueType,
};
use serde::Deserialize;
use std::collections::HashMap;

/// One row of the CSV: `ga4Key,devGuideVar,example,category,eventName,isCustomDimension`.
/// A blank `event_name` means the row is a common/user parameter shared
/// across every event, per §6.
#[derive(Debug, Deserialize)]
struct ParameterRow {
    ga4_key: String,
    dev_guide_var: String,
    #[serde(default)]
    #[allow(dead_code)]
    example: String,
    category: String,
    #[serde(default)]
    event_name: String,
    #[serde(default)]
    is_custom_dimension: String,
}

fn parse_category(raw: &str) -> ParameterCategory {
    match raw.to_lowercase().as_str() {
        "event" => ParameterCategory::Event,
        "user" => ParameterCategory::User,
        "item" => ParameterCategory::Item,
        _ => ParameterCategory::Common,
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

fn infer_value_type(ga4_key: &str) -> ValueType {
    let lower = ga4_key.to_lowercase();
    if lower.contains("price") || lower.contains("value") || lower.contains("quantity")
        || lower.contains("index")
    {
        ValueType::Number
    } else if lower.starts_with("is_") || lower.starts_with("has_") {
        ValueType::Boolean
    } else {
        ValueType::String
    }
}

/// # NDOC
/// component: `spec_store::parameters::ParameterTable`
/// purpose: Indexed view of the parameter mapping table.
pub struct ParameterTable {
    pub common_parameters: Vec<ParameterDefinition>,
    pub per_event: HashMap<EventName, Vec<ParameterDefinition>>,
    pub items_by_event: HashMap<EventName, bool>,
}

impl ParameterTable {
    pub fn event_parameter_config(&self, event_name: &str) -> EventParameterConfig {
        let mut parameters = self.common_parameters.clone();
        if let Some(specific) = self.per_event.get(event_name) {
            parameters.extend(specific.iter().cloned());
        }
        let custom = parameters.iter().filter(|p| p.is_custom_dimension).count();
        let standard = parameters.len() - custom;
        EventParameterConfig {
            event_name: event_name.to_string(),
            has_items: *self.items_by_event.get(event_name).unwrap_or(&false),
            summary: ParameterSummary {
                total: parameters.len(),
                standard,
                custom,
            },
            parameters,
        }
    }
}

pub fn load_parameter_table(csv_text: &str) -> Result<ParameterTable, OracleError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut common_parameters = Vec::new();
    let mut per_event: HashMap<EventName, Vec<ParameterDefinition>> = HashMap::new();
    let mut items_by_event: HashMap<EventName, bool> = HashMap::new();

    for result in reader.deserialize::<ParameterRow>() {
        let row: ParameterRow = result?;
        let definition = ParameterDefinition {
            value_type: infer_value_type(&row.ga4_key),
            extraction_hint: None,
            description: row.dev_guide_var.clone(),
            category: parse_category(&row.category),
            is_custom_dimension: parse_bool(&row.is_custom_dimension),
            ga4_key: row.ga4_key.clone(),
            dev_guide_var: row.dev_guide_var,
        };

        if row.ga4_key == "items" {
            if row.event_name.trim().is_empty() {
                // "items" with no event scope doesn't constrain any
                // particular event; skip rather than mark every event.
            } else {
                items_by_event.insert(row.event_name.trim().to_string(), true);
            }
            continue;
        }

        if row.event_name.trim().is_empty() {
            common_parameters.push(definition);
        } else {
            per_event
                .entry(row.event_name.trim().to_string())
                .or_default()
                .push(definition);
        }
    }

    Ok(ParameterTable {
        common_parameters,
        per_event,
        items_by_event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> &'static str {
        "ga4Key,devGuideVar,example,category,eventName,isCustomDimension\n\
         site_name,site_name,MyShop,common,,false\n\
         item_id,product_id,91736,item,view_item,false\n\
         item_name,product_name,Serum,item,view_item,false\n\
         items,items,[...],item,view_item,false\n\
         search_term,keyword,\"설화수\",event,view_search_results,false\n"
    }

    #[test]
    fn common_parameters_apply_to_every_event() {
        let table = load_parameter_table(sample_csv()).unwrap();
        let cfg = table.event_parameter_config("purchase");
        assert!(cfg.parameters.iter().any(|p| p.ga4_key == "site_name"));
    }

    #[test]
    fn event_scoped_parameters_and_items_flag() {
        let table = load_parameter_table(sample_csv()).unwrap();
        let cfg = table.event_parameter_config("view_item");
        assert!(cfg.has_items);
        assert!(cfg.parameters.iter().any(|p| p.ga4_key == "item_id"));
        assert_eq!(cfg.summary.total, 3); // site_name + item_id + item_name
    }

    #[test]
    fn event_with_no_rows_still_gets_common_parameters() {
        let table = load_parameter_table(sample_csv()).unwrap();
        let cfg = table.event_parameter_config("unmapped_event");
        assert_eq!(cfg.summary.total, 1);
        assert!(!cfg.has_items);
    }
}
