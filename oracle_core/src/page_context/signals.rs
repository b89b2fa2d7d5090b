//! # NDOC
//! component: `page_context::signals`
//! purpose: The five independent page-type signal sources from spec
//!   §4.3's table (URL path regex, URL query params, runtime global,
//!   dataLayer, DOM breadcrumb/heading), each producing a
//!   `{pageType, confidence, detail}` triple.

use crate::model::{PageType, PageTypeSignal};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Small seam over DOM access so C3 can be exercised without a live
/// browser (teacher pattern: a narrow `Send + Sync` trait at the
/// integration boundary, e.g. `tools::base_tool::BaseTool`).
pub trait DomSignalProvider: Send + Sync {
    fn breadcrumb_text(&self) -> Option<String>;
    fn heading_text(&self) -> Option<String>;
}

/// DOM signal provider with nothing observed — used for offline analyses
/// where no `Page` handle is available.
pub struct NoDomSignals;

impl DomSignalProvider for NoDomSignals {
    fn breadcrumb_text(&self) -> Option<String> {
        None
    }
    fn heading_text(&self) -> Option<String> {
        None
    }
}

/// One entry in the priority-ordered URL path regex table. Higher
/// `priority` wins when multiple rules match the same path.
struct UrlPathRule {
    pattern: Regex,
    page_type: PageType,
    priority: u8,
    /// Confidence within the 70-90 band: scaled by priority so the
    /// highest-priority rule that matches sits at the top of the band.
    confidence: u8,
}

static URL_PATH_RULES: Lazy<Vec<UrlPathRule>> = Lazy::new(|| {
    use PageType::*;
    vec![
        UrlPathRule {
            pattern: Regex::new(r"(?i)/order/complete|/orderComplete").unwrap(),
            page_type: OrderComplete,
            priority: 5,
            confidence: 90,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/order(?:/|$)").unwrap(),
            page_type: Order,
            priority: 4,
            confidence: 85,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/cart(?:/|$)").unwrap(),
            page_type: Cart,
            priority: 4,
            confidence: 85,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/prd/detail|/product/detail|/product-detail").unwrap(),
            page_type: ProductDetail,
            priority: 4,
            confidence: 85,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/display/brand/detail").unwrap(),
            page_type: BrandMain,
            priority: 4,
            confidence: 82,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/search(?:/|$)").unwrap(),
            page_type: SearchResult,
            priority: 3,
            confidence: 78,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/prd/list|/product/list|/category").unwrap(),
            page_type: ProductList,
            priority: 3,
            confidence: 75,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/live/detail").unwrap(),
            page_type: LiveDetail,
            priority: 3,
            confidence: 75,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/live(?:/|$)").unwrap(),
            page_type: LiveList,
            priority: 2,
            confidence: 72,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/my(?:/|$)|/mypage").unwrap(),
            page_type: My,
            priority: 2,
            confidence: 72,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/history(?:/|$)").unwrap(),
            page_type: History,
            priority: 2,
            confidence: 70,
        },
        UrlPathRule {
            pattern: Regex::new(r"(?i)/display/main$|^/$").unwrap(),
            page_type: Main,
            priority: 1,
            confidence: 70,
        },
    ]
});

/// Signal 1: URL path regex, priority-ordered — first rule whose priority
/// is highest among matches wins the band.
pub fn url_path_signal(url: &Url) -> Option<PageTypeSignal> {
    let path = url.path();
    URL_PATH_RULES
        .iter()
        .filter(|rule| rule.pattern.is_match(path))
        .max_by_key(|rule| rule.priority)
        .map(|rule| PageTypeSignal {
            source: "url_path_regex".to_string(),
            page_type: rule.page_type.clone(),
            confidence: rule.confidence,
            detail: format!("path '{}' matched pattern for {}", path, rule.page_type),
        })
}

/// Signal 2: URL query parameters, e.g. `searchKeyword=`.
pub fn url_query_signal(url: &Url) -> Option<PageTypeSignal> {
    if url.query_pairs().any(|(k, _)| k == "searchKeyword" || k == "query") {
        return Some(PageTypeSignal {
            source: "url_query_param".to_string(),
            page_type: PageType::SearchResult,
            confidence: 80,
            detail: "search query parameter present".to_string(),
        });
    }
    None
}

/// Signal 3: runtime "page type" global variable, read via the caller's
/// page-handle evaluation (already resolved to a string by the time it
/// reaches here).
pub fn runtime_global_signal(page_type_global: Option<&str>) -> Option<PageTypeSignal> {
    page_type_global.map(|raw| PageTypeSignal {
        source: "runtime_global".to_string(),
        page_type: PageType::from(raw.to_string()),
        confidence: 95,
        detail: format!("window page-type global = '{}'", raw),
    })
}

/// Signal 4: dataLayer `event: *_page_view` with a content-group value.
pub fn data_layer_signal(data_layer_content_group: Option<&str>) -> Option<PageTypeSignal> {
    data_layer_content_group.map(|raw| PageTypeSignal {
        source: "data_layer_page_view".to_string(),
        page_type: PageType::from(raw.to_string()),
        confidence: 90,
        detail: format!("dataLayer content group = '{}'", raw),
    })
}

const BREADCRUMB_PATTERNS: &[(&str, PageType)] = &[
    ("cart", PageType::Cart),
    ("order", PageType::Order),
    ("search", PageType::SearchResult),
];

/// Signal 5: DOM breadcrumb / heading text heuristics.
pub fn dom_signal(dom: &dyn DomSignalProvider) -> Option<PageTypeSignal> {
    let text = dom
        .breadcrumb_text()
        .or_else(|| dom.heading_text())?
        .to_lowercase();
    for (needle, page_type) in BREADCRUMB_PATTERNS.iter() {
        if text.contains(*needle) {
            return Some(PageTypeSignal {
                source: "dom_breadcrumb".to_string(),
                page_type: page_type.clone(),
                confidence: 60,
                detail: format!("breadcrumb/heading text contained '{}'", needle),
            });
        }
    }
    None
}
