// TF-IDF keyword engine: the default TopicModelEngine.
//
// Uses the `keyword_extraction` crate. A segment document is the newline-
// joined text of the posts in one time window; each line is treated as a
// separate TF-IDF document, so words used in every post of the window get
// downweighted and words distinctive to some posts rise to the top.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use stop_words::{get, LANGUAGE};
use tracing::debug;

use super::traits::{ModelHandle, TopicModelEngine};

/// Local TF-IDF engine. Zero API calls; models live in memory until released.
pub struct TfIdfEngine {
    stop_words: Vec<String>,
    models: Mutex<HashMap<ModelHandle, Vec<String>>>,
    next_id: AtomicU64,
}

impl Default for TfIdfEngine {
    fn default() -> Self {
        Self {
            stop_words: get(LANGUAGE::English),
            models: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl TfIdfEngine {
    /// Number of models currently held.
    pub fn model_count(&self) -> usize {
        self.models.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TopicModelEngine for TfIdfEngine {
    async fn build_model(&self, document: &str) -> Result<ModelHandle> {
        let lines: Vec<String> = document
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if lines.is_empty() {
            anyhow::bail!("Cannot build a keyword model from an empty document");
        }

        let handle = ModelHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut models = self
            .models
            .lock()
            .map_err(|_| anyhow::anyhow!("TF-IDF model table poisoned"))?;
        debug!(handle = handle.id(), documents = lines.len(), "Built TF-IDF model");
        models.insert(handle, lines);
        Ok(handle)
    }

    async fn top_keywords(&self, handle: &ModelHandle, k: usize) -> Result<Vec<String>> {
        let documents = {
            let models = self
                .models
                .lock()
                .map_err(|_| anyhow::anyhow!("TF-IDF model table poisoned"))?;
            models
                .get(handle)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Unknown model handle {}", handle.id()))?
        };

        let params = TfIdfParams::UnprocessedDocuments(&documents, &self.stop_words, None);
        let tfidf = TfIdf::new(params);
        let ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(k);

        Ok(ranked.into_iter().map(|(word, _)| word).collect())
    }

    async fn release(&self, handle: &ModelHandle) {
        if let Ok(mut models) = self.models.lock() {
            models.remove(handle);
        }
    }
}
