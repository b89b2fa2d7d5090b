//! # NDOC
//! component: `pool`
//! purpose: Optional two-tier worker pool recommended by spec §5: one
//!   pool bounds concurrent browser contexts, a second batches vision
//!   requests to stay under the LLM provider's rate limit. Neither is
//!   required for single-URL `AnalysisEngine::analyze` callers.
//! invariants:
//!   - Neither pool shares mutable state with another; cross-analysis
//!     sharing is limited to read-only C1/C2 models and the feedback
//!     cache.

use crate::browser::Page;
use crate::vision::Vision;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Bounds how many `Page` handles are checked out concurrently, the same
/// shape as the teacher's `subsystems::provider_platform` policy wrappers
/// around an external capability.
pub struct BrowserContextPool {
    semaphore: Arc<Semaphore>,
}

impl BrowserContextPool {
    pub fn new(capacity: usize) -> Self {
        BrowserContextPool {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Holds a permit for the duration of `f`, so at most `capacity`
    /// analyses run their DOM-bound stages at once.
    pub async fn with_page<'a, F, Fut, T>(&'a self, page: &'a dyn Page, f: F) -> T
    where
        F: FnOnce(&'a dyn Page) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _permit: SemaphorePermit<'_> = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        f(page).await
    }
}

/// Batches Stage 8 vision calls under a concurrency cap so a multi-page
/// run doesn't exceed the provider's rate limit.
pub struct VisionBatcher {
    semaphore: Arc<Semaphore>,
}

impl VisionBatcher {
    pub fn new(max_concurrent: usize) -> Self {
        VisionBatcher {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub async fn analyse(
        &self,
        vision: &dyn Vision,
        image: &[u8],
        prompt: &str,
    ) -> Result<String, String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        vision.analyse(image, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FakePage;
    use crate::vision::FakeVision;

    #[tokio::test]
    async fn browser_pool_runs_work_against_a_page() {
        let pool = BrowserContextPool::new(2);
        let page = FakePage::new().with_selector_match("a.buy", 1);
        let count = pool
            .with_page(&page, |p| async move {
                p.query_selector_all("a.buy").await.unwrap().len()
            })
            .await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn vision_batcher_forwards_to_the_underlying_service() {
        let batcher = VisionBatcher::new(1);
        let vision = FakeVision::admitting(&["page_view"]);
        let response = batcher.analyse(&vision, &[], "prompt").await.unwrap();
        assert!(response.contains("page_view"));
    }
}
