//! # NDOC
//! component: `spec_store::fallback`
//! purpose: The hard-coded ecommerce standard fallback mapping (§4.2
//!   source 2), consulted by gating Stage 4 only when no earlier source
//!   has spoken.

use crate::model::PageType;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// GA4's standard ecommerce event set and the page types each
/// conventionally fires on. Kept as a data table, not control flow, per
/// Design Note "Configuration as data, not code".
static ECOMMERCE_FALLBACK: Lazy<HashMap<&'static str, Vec<PageType>>> = Lazy::new(|| {
    use PageType::*;
    let mut m: HashMap<&'static str, Vec<PageType>> = HashMap::new();
    m.insert("view_item", vec![ProductDetail]);
    m.insert("view_item_list", vec![ProductList, SearchResult, BrandProductList]);
    m.insert("select_item", vec![ProductList, SearchResult, BrandProductList]);
    m.insert("add_to_cart", vec![ProductDetail, ProductList]);
    m.insert("remove_from_cart", vec![Cart]);
    m.insert("view_cart", vec![Cart]);
    m.insert("begin_checkout", vec![Cart, ProductDetail]);
    m.insert("add_payment_info", vec![Order]);
    m.insert("add_shipping_info", vec![Order]);
    m.insert("purchase", vec![OrderComplete]);
    m.insert("view_promotion", vec![Main]);
    m.insert("select_promotion", vec![Main]);
    m.insert("view_search_results", vec![SearchResult]);
    m
});

/// True if `event_name` is part of the ecommerce family — used by
/// testable property 7 ("Ecommerce fixedness": `event_category` is always
/// `"ecommerce"`).
pub fn is_ecommerce_event(event_name: &str) -> bool {
    ECOMMERCE_FALLBACK.contains_key(event_name)
}

pub fn ecommerce_fallback_page_types(event_name: &str) -> Option<Vec<PageType>> {
    ECOMMERCE_FALLBACK.get(event_name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_item_is_product_detail_only() {
        let pages = ecommerce_fallback_page_types("view_item").unwrap();
        assert_eq!(pages, vec![PageType::ProductDetail]);
    }

    #[test]
    fn unknown_event_has_no_fallback() {
        assert!(ecommerce_fallback_page_types("custom_internal_event").is_none());
        assert!(!is_ecommerce_event("custom_internal_event"));
    }

    #[test]
    fn purchase_is_ecommerce() {
        assert!(is_ecommerce_event("purchase"));
    }
}
