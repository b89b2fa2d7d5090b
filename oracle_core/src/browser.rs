//! # NDOC
//! component: `browser`
//! purpose: The narrow driver-facing trait the engine needs (spec §6
//!   "Browser driver interface"); any Playwright/CDP/fake implementation
//!   satisfying this shape is acceptable.
//! invariants:
//!   - Implementations must not block the executor; all methods are async.
//!   - `query_selector_all` returning `Err` is treated by the engine as
//!     zero matches, not as a fatal error (see `errors::DomQueryError`).

use async_trait::async_trait;
use serde_json::Value;

/// One matched DOM element, reduced to what the engine ever inspects.
#[derive(Debug, Clone)]
pub struct ElementHandle {
    pub tag_name: String,
    pub text_content: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// # NDOC
/// component: `browser::Page`
/// purpose: Mirrors the teacher's `BaseTool` seam: a `Send + Sync` trait
///   object the engine depends on without knowing the concrete driver.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), String>;

    /// Zero matches and query failure both collapse to `Ok(vec![])` at the
    /// engine boundary; this trait reports the distinction so callers can
    /// log it, but the gating engine's Stage 2/7 treat them identically.
    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, String>;

    async fn evaluate(&self, script: &str) -> Result<Value, String>;

    async fn screenshot(&self, path: &str) -> Result<(), String>;

    async fn cookies(&self) -> Result<Vec<(String, String)>, String>;

    async fn viewport_size(&self) -> Result<ViewportSize, String>;
}

/// Minimal fake used by unit tests and offline analysis: a DOM snapshot
/// expressed purely as selector -> match-count, with canned evaluate/
/// cookie/viewport responses.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub selector_matches: std::collections::HashMap<String, Vec<ElementHandle>>,
    pub evaluate_responses: std::collections::HashMap<String, Value>,
    pub cookies: Vec<(String, String)>,
    pub viewport: Option<ViewportSize>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector_match(mut self, selector: &str, count: usize) -> Self {
        let handles = (0..count)
            .map(|_| ElementHandle {
                tag_name: "div".to_string(),
                text_content: String::new(),
                attributes: Vec::new(),
            })
            .collect();
        self.selector_matches.insert(selector.to_string(), handles);
        self
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, _url: &str) -> Result<(), String> {
        Ok(())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, String> {
        Ok(self
            .selector_matches
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, String> {
        Ok(self
            .evaluate_responses
            .get(script)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn screenshot(&self, _path: &str) -> Result<(), String> {
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>, String> {
        Ok(self.cookies.clone())
    }

    async fn viewport_size(&self) -> Result<ViewportSize, String> {
        Ok(self.viewport.unwrap_or(ViewportSize {
            width: 1280,
            height: 800,
        }))
    }
}
