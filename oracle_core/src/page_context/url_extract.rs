//! # NDOC
//! component: `page_context::url_extract`
//! purpose: Extracts the fixed set of URL-derived parameters
//!   (`site_country`, `site_language`, `site_env`, `product_id`,
//!   `search_term`, `view_event_code`) independent of page typing, per
//!   spec §4.3 "URL extraction" and the edge-case rules that follow it.

use super::env_table::classify_host;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

static COUNTRY_LANG_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^/([a-z]{2})/([a-z]{2})(?:/|$)").unwrap());

/// Query keys checked, in priority order, for a product id.
const PRODUCT_ID_QUERY_KEYS: &[&str] = &["productId", "product_id", "prdId", "itemId"];
/// Path segment markers checked, in priority order, for a product id —
/// the segment immediately following one of these literal path tokens.
const PRODUCT_ID_PATH_MARKERS: &[&str] = &["detail", "prd", "product"];

const VIEW_EVENT_CODE_QUERY_KEYS: &[&str] = &["eventCode", "event_code"];

fn language_to_country_fallback(lang: &str) -> Option<&'static str> {
    match lang.to_lowercase().as_str() {
        "ko" => Some("KR"),
        "en" => Some("US"),
        "ja" => Some("JP"),
        "zh" => Some("CN"),
        _ => None,
    }
}

/// Extracted URL parameters, before being folded into `PageContext`.
#[derive(Debug, Clone, Default)]
pub struct UrlExtractedParams {
    pub site_country: Option<String>,
    pub site_language: Option<String>,
    pub site_env: String,
    pub product_id: Option<String>,
    pub search_term: Option<String>,
    pub view_event_code: Option<String>,
}

impl UrlExtractedParams {
    pub fn into_map(self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(v) = self.site_country {
            map.insert("site_country".to_string(), v);
        }
        if let Some(v) = self.site_language {
            map.insert("site_language".to_string(), v);
        }
        map.insert("site_env".to_string(), self.site_env);
        if let Some(v) = self.product_id {
            map.insert("product_id".to_string(), v);
        }
        if let Some(v) = self.search_term {
            map.insert("search_term".to_string(), v);
        }
        if let Some(v) = self.view_event_code {
            map.insert("view_event_code".to_string(), v);
        }
        map
    }
}

fn extract_product_id(url: &Url) -> Option<String> {
    for key in PRODUCT_ID_QUERY_KEYS {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == key) {
            return Some(v.to_string());
        }
    }
    let segments: Vec<&str> = url.path_segments()?.collect();
    for (i, segment) in segments.iter().enumerate() {
        if PRODUCT_ID_PATH_MARKERS.contains(segment) {
            if let Some(next) = segments.get(i + 1) {
                if !next.is_empty() {
                    return Some(next.to_string());
                }
            }
        }
    }
    None
}

fn extract_view_event_code(url: &Url) -> Option<String> {
    for key in VIEW_EVENT_CODE_QUERY_KEYS {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == key) {
            return Some(v.to_string());
        }
    }
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments
        .iter()
        .find(|s| s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty())
        .map(|s| s.to_string())
}

fn extract_search_term(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "searchKeyword" || k == "query" || k == "q")
        .map(|(_, v)| v.to_string())
}

/// Extracts the full fixed set of URL parameters, applying the §4.3
/// edge-case rules:
///   - a global site rooted at `/int/` with English => `site_country = GL`
///   - host-pattern table (§6) decides `site_env`
pub fn extract(url_str: &str) -> UrlExtractedParams {
    let url = match Url::parse(url_str) {
        Ok(u) => u,
        Err(_) => return UrlExtractedParams::default(),
    };

    let hostname = url.host_str().unwrap_or_default();
    let site_env = classify_host(hostname).as_str().to_string();

    let path = url.path();
    let (mut site_country, mut site_language) = (None, None);
    if let Some(caps) = COUNTRY_LANG_PATH.captures(path) {
        let cc = caps[1].to_uppercase();
        let lang = caps[2].to_uppercase();
        if cc == "INT" && lang == "EN" {
            site_country = Some("GL".to_string());
        } else if cc != "INT" {
            site_country = Some(cc);
        }
        site_language = Some(lang);
    }
    if site_country.is_none() {
        if let Some(lang) = &site_language {
            site_country = language_to_country_fallback(lang).map(|s| s.to_string());
        }
    }

    UrlExtractedParams {
        site_country,
        site_language,
        site_env,
        // url::Url::query_pairs() already percent-decodes.
        product_id: extract_product_id(&url),
        search_term: extract_search_term(&url),
        view_event_code: extract_view_event_code(&url),
    }
}
