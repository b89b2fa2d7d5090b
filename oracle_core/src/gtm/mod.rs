//! # NDOC
//! component: `gtm`
//! purpose: C1 — GTM container model. Parses an exported container
//!   document and exposes indexed accessors (`eventPageMappings`,
//!   `extractCssSelector`, `hasCustomEventTrigger`) per spec §4.1.

mod container;

pub use container::{parse, ContainerModel};
