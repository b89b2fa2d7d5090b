//! # NDOC
//! component: `spec_store`
//! purpose: C2 — declarative event/parameter knowledge independent of the
//!   GTM container: the written development guide, the ecommerce
//!   fallback table, the parameter mapping table, and site configuration
//!   (spec §4.2).

mod fallback;
mod guide;
mod parameters;
mod site_config;

pub use fallback::{ecommerce_fallback_page_types, is_ecommerce_event};
pub use guide::parse_guide;
pub use parameters::{load_parameter_table, ParameterTable};
pub use site_config::{load_site_config_bundle, BrandEventSwap, SiteConfigBundle};

use crate::model::{EventName, EventParameterConfig, ParsedEventDefinition, PageTypeSet};
use std::collections::HashMap;

/// # NDOC
/// component: `spec_store::SpecStore`
/// purpose: Unifies the four C2 sources behind the operations named in
///   §4.2 (`eventDefinition`, `allowedPages`, `parametersOf`, `siteOf`).
/// invariants:
///   - Built once at startup from already-read document strings/bytes;
///     pure thereafter.
pub struct SpecStore {
    pub definitions: HashMap<EventName, ParsedEventDefinition>,
    pub parameter_table: ParameterTable,
    pub site_bundle: SiteConfigBundle,
}

impl SpecStore {
    pub fn new(
        guide_text: &str,
        parameter_csv: &str,
        site_bundle: SiteConfigBundle,
    ) -> Result<Self, crate::errors::OracleError> {
        let definitions = guide::parse_guide(guide_text)?;
        let parameter_table = parameters::load_parameter_table(parameter_csv)?;
        Ok(SpecStore {
            definitions,
            parameter_table,
            site_bundle,
        })
    }

    pub fn event_definition(&self, event_name: &str) -> Option<&ParsedEventDefinition> {
        self.definitions.get(event_name)
    }

    /// `allowedPages(eventName, source) -> PageType[] | "ALL"`. `source`
    /// selects between the written guide and the ecommerce fallback;
    /// the GTM source is answered by `ContainerModel` directly, not here.
    pub fn allowed_pages(&self, event_name: &str, source: AllowedPagesSource) -> PageTypeSet {
        match source {
            AllowedPagesSource::Guide => self
                .definitions
                .get(event_name)
                .map(|d| d.allowed_page_types.clone())
                .unwrap_or_else(PageTypeSet::empty),
            AllowedPagesSource::Ga4Standard => {
                let pages = fallback::ecommerce_fallback_page_types(event_name);
                match pages {
                    Some(pages) => PageTypeSet::Explicit(pages.into_iter().collect()),
                    None => PageTypeSet::empty(),
                }
            }
        }
    }

    pub fn parameters_of(&self, event_name: &str) -> EventParameterConfig {
        self.parameter_table.event_parameter_config(event_name)
    }

    pub fn site_of(&self, url: &str) -> crate::model::SiteConfig {
        self.site_bundle.site_of(url)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AllowedPagesSource {
    Guide,
    Ga4Standard,
}
