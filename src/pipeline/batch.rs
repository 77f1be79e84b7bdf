// Batch evaluation: many pairs, evaluated concurrently.
//
// Pairs share no scoring state; segment artifacts are keyed by pair id and
// the report sink serializes its own writes. A pair that fails outright
// (missing dump, report write error) is logged and counted, never fatal to
// the batch.

use std::path::Path;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::evaluator::{PairEvaluator, PairOutcome};
use crate::profile::{ProfileRef, ProfileSource};

/// Totals for a finished batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<PairOutcome>,
    /// (pair, error) for pairs that produced no outcome at all
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn matches(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.prediction.is_some_and(|p| p.is_match()))
            .count()
    }

    pub fn non_matches(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.prediction.is_some_and(|p| !p.is_match()))
            .count()
    }

    pub fn unclassified(&self) -> usize {
        self.outcomes.iter().filter(|o| o.prediction.is_none()).count()
    }
}

/// Read a manifest of `[["net:user", "net:user"], ...]`.
pub fn load_manifest(path: &Path) -> Result<Vec<(ProfileRef, ProfileRef)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pair manifest {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse pair manifest {}", path.display()))
}

pub async fn run(
    evaluator: &PairEvaluator,
    source: &dyn ProfileSource,
    pairs: Vec<(ProfileRef, ProfileRef)>,
    concurrency: usize,
) -> Result<BatchSummary> {
    let concurrency = concurrency.max(1);
    info!(pairs = pairs.len(), concurrency, "Starting batch evaluation");

    let pb = ProgressBar::new(pairs.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("  Pairs [{bar:30}] {pos}/{len} ({eta})")
            .context("Invalid progress bar template")?,
    );

    let results: Vec<(String, Result<PairOutcome>)> = stream::iter(pairs.into_iter().map(|(a, b)| {
        let pb = pb.clone();
        async move {
            let label = format!("{a}~{b}");
            let result = evaluator.evaluate_refs(source, &a, &b).await;
            pb.inc(1);
            (label, result)
        }
    }))
    .buffer_unordered(concurrency)
    .collect()
    .await;
    pb.finish_and_clear();

    let mut summary = BatchSummary::default();
    for (label, result) in results {
        match result {
            Ok(outcome) => summary.outcomes.push(outcome),
            Err(e) => {
                warn!(pair = %label, error = %e, "Pair evaluation failed");
                summary.failed.push((label, format!("{e:#}")));
            }
        }
    }

    info!(
        evaluated = summary.outcomes.len(),
        failed = summary.failed.len(),
        matches = summary.matches(),
        "Batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parses_pairs() {
        let path = std::env::temp_dir().join(format!("crossmatch-manifest-{}.json", std::process::id()));
        std::fs::write(&path, r#"[["facebook:alice", "twitter:al"], ["Facebook:bob", "twitter:bobby"]]"#).unwrap();

        let pairs = load_manifest(&path).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1.user_id, "al");
        assert_eq!(pairs[1].0.network, "facebook");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_manifest_rejects_bad_ref() {
        let path = std::env::temp_dir().join(format!("crossmatch-bad-manifest-{}.json", std::process::id()));
        std::fs::write(&path, r#"[["alice", "twitter:al"]]"#).unwrap();
        assert!(load_manifest(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
