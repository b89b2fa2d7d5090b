//! # NDOC
//! component: `spec_store::site_config`
//! purpose: Site configuration bundle (§4.2 source 4 / §6 "Site
//!   configuration"): host -> site name, event-name aliases, DOM
//!   attribute prefixes, variable naming conventions, plus the
//!   site-specific rule tables the gating engine needs (edge-case
//!   registry, linked-event rules) — structured so a new site onboards by
//!   dropping in one bundle, per Design Note "Configuration as data".

use crate::gating::edge_cases::EdgeCaseRule;
use crate::gating::linked_events::LinkedEventRule;
use crate::model::SiteConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteConfigBundle {
    pub sites: HashMap<String, SiteConfig>,
    #[serde(default)]
    pub edge_cases: Vec<EdgeCaseRule>,
    #[serde(default)]
    pub linked_event_rules: Vec<LinkedEventRule>,
    #[serde(default)]
    pub gtm_inference_unreliable_events: Vec<String>,
    #[serde(default)]
    pub forced_auto_inclusion_events: Vec<String>,
    #[serde(default)]
    pub brand_event_swap: Option<BrandEventSwap>,
}

/// Stage 5's site-specific "blocked event -> replacement event" rewrite,
/// modeled as data rather than a hard-coded pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandEventSwap {
    pub blocked_event: String,
    pub replacement_event: String,
}

impl SiteConfigBundle {
    pub fn site_of(&self, url: &str) -> SiteConfig {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();
        self.sites.get(&host).cloned().unwrap_or(SiteConfig {
            host,
            ..Default::default()
        })
    }
}

pub fn load_site_config_bundle(json_text: &str) -> Result<SiteConfigBundle, crate::errors::OracleError> {
    serde_json::from_str(json_text)
        .map_err(|e| crate::errors::OracleError::config("spec_store::site_config", e.to_string(), "site config bundle"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_of_falls_back_to_bare_host_when_unconfigured() {
        let bundle = SiteConfigBundle::default();
        let site = bundle.site_of("https://shop.example.com/kr/ko/display/main");
        assert_eq!(site.host, "shop.example.com");
        assert_eq!(site.site_name, "");
    }

    #[test]
    fn site_of_returns_configured_entry() {
        let mut bundle = SiteConfigBundle::default();
        bundle.sites.insert(
            "shop.example.com".to_string(),
            SiteConfig {
                host: "shop.example.com".to_string(),
                site_name: "Example Shop".to_string(),
                ..Default::default()
            },
        );
        let site = bundle.site_of("https://shop.example.com/kr/ko/display/main");
        assert_eq!(site.site_name, "Example Shop");
    }
}
