// Cross-source topic similarity over aligned time segments.
//
// Only segment indices present on both sides are compared. For each, the
// top-K keywords of both models are fetched and every keyword on side A that
// matches any keyword on side B (case-insensitive) counts once. Repeated
// keywords on side A therefore count repeatedly. The total is divided by
// (common segments * K) and clamped to 1.0.
//
// "No common segments" is its own outcome and is never folded into a
// measured 0.0 here; the feature builder decides what number it becomes.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::store::{SegmentKey, SegmentStore};
use super::traits::TopicModelEngine;
use crate::services::ServiceGuard;

/// Result of a topic comparison between two accounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TopicSimilarity {
    /// Neither side has a segment index in common with the other
    NoCommonData,
    /// The topic engine failed for a segment both sides have
    Unavailable(String),
    Measured(f64),
}

impl TopicSimilarity {
    pub fn measured(&self) -> Option<f64> {
        match self {
            TopicSimilarity::Measured(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for TopicSimilarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicSimilarity::NoCommonData => write!(f, "no common data"),
            TopicSimilarity::Unavailable(reason) => write!(f, "unavailable ({reason})"),
            TopicSimilarity::Measured(v) => write!(f, "{v:.4}"),
        }
    }
}

/// What was compared for one aligned segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentComparison {
    pub index: usize,
    pub keywords_a: Vec<String>,
    pub keywords_b: Vec<String>,
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSimilarityReport {
    pub similarity: TopicSimilarity,
    pub comparisons: Vec<SegmentComparison>,
}

/// One side of a topic comparison: which account's segments to read.
#[derive(Debug, Clone, Copy)]
pub struct SegmentOwner<'a> {
    pub source_name: &'a str,
    pub user_id: &'a str,
}

/// Count keywords in `a` that appear anywhere in `b`, ignoring case.
pub fn count_matches(a: &[String], b: &[String]) -> usize {
    let b_lower: HashSet<String> = b.iter().map(|k| k.to_lowercase()).collect();
    a.iter().filter(|k| b_lower.contains(&k.to_lowercase())).count()
}

/// Scores keyword overlap between two accounts' stored segments.
pub struct TopicSimilarityScorer {
    engine: Arc<dyn TopicModelEngine>,
    store: Arc<SegmentStore>,
    top_k: usize,
    guard: ServiceGuard,
}

impl TopicSimilarityScorer {
    /// `top_k` is K, the keywords compared per segment. `Config` rejects 0;
    /// a library caller passing 0 gets 1 so the score's divisor is never zero.
    pub fn new(
        engine: Arc<dyn TopicModelEngine>,
        store: Arc<SegmentStore>,
        top_k: usize,
        guard: ServiceGuard,
    ) -> Self {
        Self {
            engine,
            store,
            top_k: top_k.max(1),
            guard,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn score(
        &self,
        pair: &str,
        a: SegmentOwner<'_>,
        b: SegmentOwner<'_>,
    ) -> TopicSimilarityReport {
        let indices_a = self.store.indices(pair, a.source_name, a.user_id);
        let indices_b = self.store.indices(pair, b.source_name, b.user_id);
        let common: Vec<usize> = indices_a.intersection(&indices_b).copied().collect();

        if common.is_empty() {
            debug!(
                pair,
                a = indices_a.len(),
                b = indices_b.len(),
                "No segment index present on both sides"
            );
            return TopicSimilarityReport {
                similarity: TopicSimilarity::NoCommonData,
                comparisons: Vec::new(),
            };
        }

        let mut comparisons = Vec::with_capacity(common.len());
        for index in &common {
            let keywords_a = match self.keywords(pair, a, *index).await {
                Ok(k) => k,
                Err(reason) => return unavailable(reason, comparisons),
            };
            let keywords_b = match self.keywords(pair, b, *index).await {
                Ok(k) => k,
                Err(reason) => return unavailable(reason, comparisons),
            };

            let matches = count_matches(&keywords_a, &keywords_b);
            debug!(
                pair,
                segment = index,
                keywords_a = ?keywords_a,
                keywords_b = ?keywords_b,
                matches,
                "Compared segment keywords"
            );
            comparisons.push(SegmentComparison {
                index: *index,
                keywords_a,
                keywords_b,
                matches,
            });
        }

        let total: usize = comparisons.iter().map(|c| c.matches).sum();
        let score = (total as f64 / (common.len() * self.top_k) as f64).min(1.0);

        TopicSimilarityReport {
            similarity: TopicSimilarity::Measured(score),
            comparisons,
        }
    }

    async fn keywords(
        &self,
        pair: &str,
        owner: SegmentOwner<'_>,
        index: usize,
    ) -> Result<Vec<String>, String> {
        let key = SegmentKey::new(pair, owner.source_name, owner.user_id, index);
        let segment = self
            .store
            .get(&key)
            .ok_or_else(|| format!("segment {index} of {} disappeared", owner.user_id))?;

        let engine = &self.engine;
        let k = self.top_k;
        self.guard
            .call("topic-engine", "top_keywords", || {
                engine.top_keywords(&segment.handle, k)
            })
            .await
            .map_err(|e| {
                warn!(pair, segment = index, user = owner.user_id, error = %e, "Keyword lookup failed");
                format!("{e:#}")
            })
    }
}

fn unavailable(reason: String, comparisons: Vec<SegmentComparison>) -> TopicSimilarityReport {
    TopicSimilarityReport {
        similarity: TopicSimilarity::Unavailable(reason),
        comparisons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_count_matches_ignores_case() {
        assert_eq!(count_matches(&words(&["Rust", "tokio"]), &words(&["rust", "serde"])), 1);
    }

    #[test]
    fn test_count_matches_repeats_inflate() {
        assert_eq!(count_matches(&words(&["rust", "rust", "go"]), &words(&["RUST"])), 2);
    }

    #[test]
    fn test_count_matches_empty() {
        assert_eq!(count_matches(&[], &words(&["rust"])), 0);
        assert_eq!(count_matches(&words(&["rust"]), &[]), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(TopicSimilarity::Measured(0.25).to_string(), "0.2500");
        assert_eq!(TopicSimilarity::NoCommonData.to_string(), "no common data");
        assert_eq!(TopicSimilarity::NoCommonData.measured(), None);
    }
}
