//! # NDOC
//! component: `page_context`
//! purpose: C3, the page context detector — fuses the independent
//!   signal sources from `signals` with the URL-derived parameters from
//!   `url_extract` into one `PageContext` per spec §4.3.
//! invariants:
//!   - Exactly one `page_type` is ever reported; disagreement is recorded
//!     via `has_conflict`, never surfaced as multiple types.
//!   - Absence of every signal resolves to `PageType::Others` at
//!     confidence 30, never an error — page typing is best-effort.

pub mod env_table;
pub mod signals;
pub mod url_extract;

use crate::model::{PageContext, PageType, PageTypeSignal};
use signals::DomSignalProvider;
use std::collections::HashMap;
use url::Url;

/// Priority class used only to break near-ties (within
/// [`TIE_BREAK_MARGIN`] points) between competing page types, highest
/// first: a runtime global is closer to ground truth than a DOM guess.
fn priority_rank(source: &str) -> u8 {
    match source {
        "runtime_global" => 4,
        "data_layer_page_view" => 3,
        "url_query_param" => 2,
        "url_path_regex" => 1,
        "dom_breadcrumb" => 0,
        _ => 0,
    }
}

const TIE_BREAK_MARGIN: u8 = 5;
/// Added to a group's top confidence for each additional independent
/// signal agreeing with it, capped at 99.
const AGREEMENT_BONUS: u8 = 8;

struct ScoredGroup {
    page_type: PageType,
    score: u8,
    top_priority: u8,
    signals: Vec<PageTypeSignal>,
}

fn fuse(signals: Vec<PageTypeSignal>) -> (PageType, u8, bool, Vec<PageTypeSignal>) {
    if signals.is_empty() {
        return (PageType::Others, 30, false, Vec::new());
    }

    let mut groups: Vec<ScoredGroup> = Vec::new();
    for signal in signals {
        if let Some(group) = groups.iter_mut().find(|g| g.page_type == signal.page_type) {
            group.top_priority = group.top_priority.max(priority_rank(&signal.source));
            group.signals.push(signal);
        } else {
            groups.push(ScoredGroup {
                page_type: signal.page_type.clone(),
                score: 0,
                top_priority: priority_rank(&signal.source),
                signals: vec![signal],
            });
        }
    }

    for group in groups.iter_mut() {
        let max_confidence = group.signals.iter().map(|s| s.confidence).max().unwrap_or(0);
        let bonus = AGREEMENT_BONUS.saturating_mul((group.signals.len() as u8).saturating_sub(1));
        group.score = max_confidence.saturating_add(bonus).min(99);
    }

    groups.sort_by(|a, b| b.score.cmp(&a.score));
    let top_score = groups[0].score;
    let contenders: Vec<&ScoredGroup> = groups
        .iter()
        .take_while(|g| top_score.saturating_sub(g.score) <= TIE_BREAK_MARGIN)
        .collect();

    let winner = contenders
        .into_iter()
        .max_by_key(|g| (g.top_priority, g.score))
        .unwrap();

    let has_conflict = groups.len() > 1
        && groups
            .iter()
            .filter(|g| g.page_type != winner.page_type)
            .any(|g| top_score.saturating_sub(g.score) <= TIE_BREAK_MARGIN);

    let all_signals: Vec<PageTypeSignal> = groups.into_iter().flat_map(|g| g.signals).collect();
    (winner.page_type.clone(), winner.score, has_conflict, all_signals)
}

/// Raw signal inputs gathered by the caller before fusion: everything
/// that isn't derivable from the URL alone.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSignalInputs {
    pub page_type_global: Option<String>,
    pub data_layer_content_group: Option<String>,
    pub is_logged_in: Option<bool>,
}

/// Runs full page-type detection for one URL, fusing all five signal
/// sources and attaching URL-extracted parameters.
pub fn detect(url_str: &str, runtime: &RuntimeSignalInputs, dom: &dyn DomSignalProvider) -> PageContext {
    let url_extracted = url_extract::extract(url_str);
    let parsed_url = Url::parse(url_str).ok();

    let mut gathered = Vec::new();
    if let Some(url) = &parsed_url {
        if let Some(s) = signals::url_path_signal(url) {
            gathered.push(s);
        }
        if let Some(s) = signals::url_query_signal(url) {
            gathered.push(s);
        }
    }
    if let Some(s) = signals::runtime_global_signal(runtime.page_type_global.as_deref()) {
        gathered.push(s);
    }
    if let Some(s) = signals::data_layer_signal(runtime.data_layer_content_group.as_deref()) {
        gathered.push(s);
    }
    if let Some(s) = signals::dom_signal(dom) {
        gathered.push(s);
    }

    let (page_type, confidence, has_conflict, all_signals) = fuse(gathered);

    let query_params: HashMap<String, String> = parsed_url
        .as_ref()
        .map(|u| {
            u.query_pairs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    PageContext {
        url: url_str.to_string(),
        pathname: parsed_url.as_ref().map(|u| u.path().to_string()).unwrap_or_default(),
        hostname: parsed_url.as_ref().and_then(|u| u.host_str()).unwrap_or_default().to_string(),
        page_type,
        page_type_confidence: confidence,
        page_type_signals: all_signals,
        has_conflict,
        query_params,
        url_extracted_params: url_extracted.into_map(),
        is_logged_in: runtime.is_logged_in,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signals::NoDomSignals;

    #[test]
    fn single_signal_resolves_directly() {
        let ctx = detect(
            "https://shop.example.com/prd/detail/91736",
            &RuntimeSignalInputs::default(),
            &NoDomSignals,
        );
        assert_eq!(ctx.page_type, PageType::ProductDetail);
        assert!(!ctx.has_conflict);
    }

    #[test]
    fn agreeing_signals_raise_confidence_above_either_alone() {
        let runtime = RuntimeSignalInputs {
            page_type_global: Some("PRODUCT_DETAIL".to_string()),
            ..Default::default()
        };
        let ctx = detect(
            "https://shop.example.com/prd/detail/91736",
            &runtime,
            &NoDomSignals,
        );
        assert_eq!(ctx.page_type, PageType::ProductDetail);
        assert!(ctx.page_type_confidence > 90);
        assert!(!ctx.has_conflict);
    }

    #[test]
    fn tie_break_favors_higher_priority_source_within_margin() {
        let signals = vec![
            PageTypeSignal {
                source: "url_path_regex".to_string(),
                page_type: PageType::ProductDetail,
                confidence: 85,
                detail: String::new(),
            },
            PageTypeSignal {
                source: "runtime_global".to_string(),
                page_type: PageType::Cart,
                confidence: 82,
                detail: String::new(),
            },
        ];
        let (page_type, _, has_conflict, _) = fuse(signals);
        assert_eq!(page_type, PageType::Cart);
        assert!(has_conflict);
    }

    #[test]
    fn no_signals_defaults_to_others() {
        let ctx = detect(
            "https://shop.example.com/some/unrecognized/path",
            &RuntimeSignalInputs::default(),
            &NoDomSignals,
        );
        assert_eq!(ctx.page_type, PageType::Others);
        assert_eq!(ctx.page_type_confidence, 30);
    }

    #[test]
    fn url_extracted_params_are_attached() {
        let ctx = detect(
            "https://shop.example.com/kr/ko/prd/detail/91736",
            &RuntimeSignalInputs::default(),
            &NoDomSignals,
        );
        assert_eq!(
            ctx.url_extracted_params.get("site_country").map(String::as_str),
            Some("KR")
        );
        assert_eq!(
            ctx.url_extracted_params.get("product_id").map(String::as_str),
            Some("91736")
        );
    }
}
