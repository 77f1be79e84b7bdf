// Topic model engine trait: the port the segment pipeline talks to.
//
// Building a model and reading its keywords are separate calls so the
// segmenter can build once and the similarity scorer can read later. The
// handle is opaque; only the engine that issued it can interpret it.

use anyhow::Result;
use async_trait::async_trait;

/// Opaque reference to a model built by a TopicModelEngine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(u64);

impl ModelHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Unsupervised keyword/topic extraction over one text document.
#[async_trait]
pub trait TopicModelEngine: Send + Sync {
    /// Build a keyword model for a document.
    async fn build_model(&self, document: &str) -> Result<ModelHandle>;

    /// Up to `k` terms, highest ranked first.
    async fn top_keywords(&self, handle: &ModelHandle, k: usize) -> Result<Vec<String>>;

    /// Drop a model the caller no longer needs. Engines without per-model
    /// state can ignore this.
    async fn release(&self, _handle: &ModelHandle) {}
}
