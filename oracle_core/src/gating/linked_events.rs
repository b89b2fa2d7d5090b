//! # NDOC
//! component: `gating::linked_events`
//! purpose: Stage 9's linked-event propagation rule set (spec §4.4 Stage
//!   9) — a static list of `{primary, linked, reason}` triples, modeled as
//!   data so a site can be onboarded without touching the engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedEventRule {
    pub primary: String,
    pub linked: String,
    pub reason: String,
}

/// Returns the rules, if any, whose `primary` matches `event_name` — used
/// by Stage 9 to find what to promote once `event_name`'s UI was
/// confirmed visible.
pub fn rules_for_primary<'a>(rules: &'a [LinkedEventRule], event_name: &str) -> Vec<&'a LinkedEventRule> {
    rules.iter().filter(|r| r.primary == event_name).collect()
}
