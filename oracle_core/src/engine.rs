//! # NDOC
//! component: `engine`
//! purpose: Top-level orchestration tying C1–C5 together for one URL
//!   (spec §2 "Data flow"): C3 builds a `PageContext`, C4 consumes
//!   C1+C2+C3 to produce the admissible-event partition, C5 consumes
//!   C1+C3+that partition to predict parameter values per admitted
//!   event. Mirrors the teacher's `pipeline::execute_pipeline` shape —
//!   a single entry point producing one structured result — but fixed
//!   to this five-stage composition rather than a dynamic step list.

use crate::browser::Page;
use crate::errors::ConsistencyWarning;
use crate::feedback::FeedbackStore;
use crate::gating::{self, GatingResult};
use crate::gtm::ContainerModel;
use crate::logging::{clear_current_analysis_id, set_current_analysis_id};
use crate::model::{EventDecision, EventName, ParameterPrediction, PageType};
use crate::page_context::{self, signals::DomSignalProvider, RuntimeSignalInputs};
use crate::param_predictor::{self, CallerProvidedContext};
use crate::spec_store::SpecStore;
use crate::vision::Vision;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static ANALYSIS_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_analysis_id() -> String {
    format!("analysis-{}", ANALYSIS_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// One event GTM would admit that the engine ultimately blocked, per §6
/// `gtmBlockedEvents: {eventName, canFire:false, summary}[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GtmBlockedEventSummary {
    pub event_name: EventName,
    pub can_fire: bool,
    pub summary: String,
}

/// The wire-format analysis output, field-for-field per spec §6
/// "Analysis output". `noUIEvents` is the one field whose wire name
/// doesn't follow plain camelCase of its Rust name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub url: String,
    pub page_type: PageType,
    pub page_type_description: String,
    pub actually_can_fire: Vec<EventDecision>,
    #[serde(rename = "noUIEvents")]
    pub no_ui_events: Vec<EventDecision>,
    pub gtm_blocked_events: Vec<GtmBlockedEventSummary>,
    pub auto_collected_events: Vec<EventName>,
    pub summary: String,
}

/// Everything one `analyze()` call produces: the §6 wire payload, plus
/// the C5 `PredictedEventSet` and any `ConsistencyWarning`s — both
/// outside the wire shape (§2: "an optional downstream validator
/// compares `PredictedEventSet` against captured dataLayer events", a
/// separate artifact from `AnalysisOutput`).
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub output: AnalysisOutput,
    pub predicted_parameters: HashMap<EventName, Vec<ParameterPrediction>>,
    pub consistency_warnings: Vec<ConsistencyWarning>,
}

fn describe_page_type(page_type: &PageType) -> String {
    match page_type {
        PageType::Main => "Site home / landing page".to_string(),
        PageType::ProductDetail => "Single product detail page".to_string(),
        PageType::ProductList => "Product listing / category page".to_string(),
        PageType::SearchResult => "Search result page".to_string(),
        PageType::Cart => "Shopping cart page".to_string(),
        PageType::Order => "Checkout / order page".to_string(),
        PageType::OrderComplete => "Order confirmation page".to_string(),
        PageType::EventDetail => "Single promotional event detail page".to_string(),
        PageType::EventList => "Promotional event listing page".to_string(),
        PageType::BrandMain => "Brand shop-in-shop landing page".to_string(),
        PageType::BrandProductList => "Brand shop-in-shop product listing page".to_string(),
        PageType::BrandEventList => "Brand shop-in-shop event listing page".to_string(),
        PageType::BrandCustomEtc => "Brand shop-in-shop custom page".to_string(),
        PageType::LiveDetail => "Live-commerce broadcast page".to_string(),
        PageType::LiveList => "Live-commerce broadcast listing page".to_string(),
        PageType::My => "Account / my-page page".to_string(),
        PageType::History => "Order or browsing history page".to_string(),
        PageType::Others => "Unclassified page".to_string(),
        PageType::Other(label) => format!("Site-specific page type ({label})"),
    }
}

fn summarize(gating_result: &GatingResult, page_type: &PageType) -> String {
    format!(
        "{} page: {} can fire, {} need UI confirmation, {} blocked, {} auto-collected",
        page_type,
        gating_result.can_fire.len(),
        gating_result.no_ui.len(),
        gating_result.blocked.len(),
        gating_result.auto_collected.len(),
    )
}

/// Holds read-only references to C1/C2, built once at startup and
/// reused across analyses (spec §3 "Lifecycle").
pub struct AnalysisEngine<'a> {
    pub container: &'a ContainerModel,
    pub spec_store: &'a SpecStore,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(container: &'a ContainerModel, spec_store: &'a SpecStore) -> Self {
        AnalysisEngine {
            container,
            spec_store,
        }
    }

    /// Runs one full analysis for `url`: C3 → C4 → C5, per §2's data
    /// flow. `page`/`vision`/`screenshot` are forwarded to C4 unchanged;
    /// absent, Stage 7/8 degrade per their documented failure semantics.
    #[allow(clippy::too_many_arguments)]
    pub async fn analyze(
        &self,
        url: &str,
        runtime: &RuntimeSignalInputs,
        dom: &dyn DomSignalProvider,
        page: Option<&dyn Page>,
        vision: Option<&dyn Vision>,
        screenshot: Option<&[u8]>,
        caller_ctx: &CallerProvidedContext,
        feedback: Option<&dyn FeedbackStore>,
    ) -> AnalysisResult {
        set_current_analysis_id(next_analysis_id());

        let page_ctx = page_context::detect(url, runtime, dom);

        let mut consistency_warnings = Vec::new();
        if page_ctx.has_conflict {
            consistency_warnings.push(
                ConsistencyWarning::new(
                    "page_type_signal_conflict",
                    format!(
                        "competing page-type signals within the tie-break margin; resolved to {}",
                        page_ctx.page_type
                    ),
                )
                .with_detail(serde_json::json!(page_ctx.page_type_signals)),
            );
        }

        let site_config = self.spec_store.site_bundle.clone();
        let gating_result = gating::decide(
            self.container,
            self.spec_store,
            &site_config,
            &page_ctx,
            page,
            vision,
            screenshot,
        )
        .await;

        let mut predicted_parameters: HashMap<EventName, Vec<ParameterPrediction>> = HashMap::new();
        for decision in gating_result.can_fire.iter().chain(gating_result.no_ui.iter()) {
            let predictions = param_predictor::predict(
                &decision.event_name,
                &page_ctx,
                self.spec_store,
                caller_ctx,
                feedback,
            )
            .await;
            predicted_parameters.insert(decision.event_name.clone(), predictions);
        }

        let gtm_blocked_events: Vec<GtmBlockedEventSummary> = gating_result
            .blocked
            .iter()
            .map(|d| GtmBlockedEventSummary {
                event_name: d.event_name.clone(),
                can_fire: false,
                summary: d.reason.clone(),
            })
            .collect();

        let summary = summarize(&gating_result, &page_ctx.page_type);
        let output = AnalysisOutput {
            url: url.to_string(),
            page_type_description: describe_page_type(&page_ctx.page_type),
            page_type: page_ctx.page_type,
            actually_can_fire: gating_result.can_fire,
            no_ui_events: gating_result.no_ui,
            gtm_blocked_events,
            auto_collected_events: gating_result.auto_collected,
            summary,
        };

        clear_current_analysis_id();

        AnalysisResult {
            output,
            predicted_parameters,
            consistency_warnings,
        }
    }
}
