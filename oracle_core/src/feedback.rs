//! # NDOC
//! component: `feedback`
//! purpose: The only cross-analysis mutable state (spec §3/§5/§9): an
//!   append-only `{eventName -> {pagePath -> Set<observed>}}` store that
//!   C5 may consult as a quality-of-prediction hint. Correctness of
//!   prediction must never depend on its presence.
//! invariants:
//!   - Writes to a given `(event_name, page_path)` key are serialized; a
//!     per-key lock suffices, no cross-key transaction is needed.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// # NDOC
/// component: `feedback::FeedbackStore`
/// purpose: Trait boundary so callers can back the cache with an
///   in-memory map (tests, short-lived CLI runs) or something durable,
///   mirroring the teacher's `AnalyticsRunStore`-behind-a-trait pattern.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn observe(&self, event_name: &str, page_path: &str, value: serde_json::Value);

    async fn observed_values(&self, event_name: &str, page_path: &str) -> Vec<serde_json::Value>;
}

#[derive(Default)]
pub struct InMemoryFeedbackStore {
    data: RwLock<HashMap<(String, String), HashSet<String>>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn observe(&self, event_name: &str, page_path: &str, value: serde_json::Value) {
        let serialized = value.to_string();
        let mut guard = self.data.write().await;
        guard
            .entry((event_name.to_string(), page_path.to_string()))
            .or_default()
            .insert(serialized);
    }

    async fn observed_values(&self, event_name: &str, page_path: &str) -> Vec<serde_json::Value> {
        let guard = self.data.read().await;
        guard
            .get(&(event_name.to_string(), page_path.to_string()))
            .into_iter()
            .flatten()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }
}
