//! # NDOC
//! component: `vision`
//! purpose: The vision-LLM collaborator interface (spec §6 "Vision service
//!   interface") plus the balanced-brace JSON recovery routine Stage 8
//!   needs for prose-wrapped responses (spec §9 "Vision JSON parsing").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One event's UI-presence verdict as returned by the vision service.
/// Field names follow the wire shape from §6 verbatim
/// (`{eventName, hasUI, reason, confidence}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionVerificationResult {
    pub event_name: String,
    #[serde(rename = "hasUI")]
    pub has_ui: bool,
    pub reason: String,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VisionResponse {
    pub verification_results: Vec<VisionVerificationResult>,
    pub page_analysis: Option<String>,
}

/// # NDOC
/// component: `vision::Vision`
/// purpose: `analyse(image, prompt) -> string`, per §6; the engine parses
///   the returned string itself via `extract_vision_response`.
#[async_trait]
pub trait Vision: Send + Sync {
    async fn analyse(&self, image: &[u8], prompt: &str) -> Result<String, String>;
}

/// Locates the first `{` and the last `}` in `raw` and attempts to parse
/// the slice between them as a `VisionResponse`. The response may be
/// fenced-code-wrapped, embedded in prose, or truncated; this recovers the
/// common cases without requiring the service to emit clean JSON.
pub fn extract_vision_response(raw: &str) -> Option<VisionResponse> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let slice = &raw[start..=end];
    serde_json::from_str(slice).ok()
}

/// Fake vision service for tests: always returns a fixed response string.
pub struct FakeVision {
    pub response: String,
}

impl FakeVision {
    pub fn admitting(event_names: &[&str]) -> Self {
        let results: Vec<VisionVerificationResult> = event_names
            .iter()
            .map(|name| VisionVerificationResult {
                event_name: name.to_string(),
                has_ui: true,
                reason: "element visible in screenshot".to_string(),
                confidence: 90,
            })
            .collect();
        let body = VisionResponse {
            verification_results: results,
            page_analysis: Some("fake analysis".to_string()),
        };
        FakeVision {
            response: serde_json::to_string(&body).unwrap(),
        }
    }

    pub fn failing() -> Self {
        FakeVision {
            response: String::new(),
        }
    }
}

#[async_trait]
impl Vision for FakeVision {
    async fn analyse(&self, _image: &[u8], _prompt: &str) -> Result<String, String> {
        if self.response.is_empty() {
            return Err("vision service unavailable".to_string());
        }
        Ok(self.response.clone())
    }
}
