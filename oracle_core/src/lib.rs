//! # NDOC
//! component: `oracle_core`
//! purpose: Library crate for the analytics event oracle engine — GA4/GTM
//!   event-admissibility and parameter-value prediction, driven from a
//!   GTM container export, a written development guide, a parameter
//!   mapping table, and a site configuration bundle (spec §1). No
//!   process-level I/O lives here; callers hand in already-read strings
//!   and an implementation of `Page`/`Vision`.

pub mod browser;
pub mod engine;
pub mod errors;
pub mod feedback;
pub mod gating;
pub mod gtm;
pub mod logging;
pub mod model;
pub mod page_context;
pub mod param_predictor;
pub mod pool;
pub mod spec_store;
pub mod vision;

pub use engine::{AnalysisEngine, AnalysisOutput};
pub use errors::OracleError;
