// One profile pair, end to end.
//
// segment -> topic-model -> feature vector -> classify -> report
//
// Nothing in here aborts a pair because one signal is missing. Every
// degradation becomes a PairNote on the outcome (and a warn! line); only a
// classifier that can't be loaded or can't read the vector withholds the
// verdict, and even then the features are still reported.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{ClassifierError, MatchClassifier, Prediction};
use crate::profile::{ProfileBundle, ProfileRef, ProfileSource};
use crate::report::{rows, ReportSink};
use crate::scoring::features::{FeatureBreakdown, FeatureVectorBuilder, TopicSignal};

/// Sequence number for segment-store keys, unique per process.
static EVALUATION_SEQ: AtomicU64 = AtomicU64::new(0);

/// A degradation recorded while evaluating a pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PairNote {
    /// The account has no posts; topic similarity not computed
    MissingPosts { account: String },
    /// The account has no friends; friend similarity is 0.0
    MissingFriends { account: String },
    UnresolvableLocation { location: String, reason: String },
    ExternalService { service: String, detail: String },
    /// Both accounts have segments but none at the same index
    NoCommonSegments,
    ClassifierUnavailable { reason: String },
}

impl fmt::Display for PairNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairNote::MissingPosts { account } => write!(f, "{account} has no posts"),
            PairNote::MissingFriends { account } => write!(f, "{account} has no friends"),
            PairNote::UnresolvableLocation { location, reason } => {
                write!(f, "location {location:?} unresolved: {reason}")
            }
            PairNote::ExternalService { service, detail } => write!(f, "{service}: {detail}"),
            PairNote::NoCommonSegments => write!(f, "no common time segments"),
            PairNote::ClassifierUnavailable { reason } => write!(f, "classifier unavailable: {reason}"),
        }
    }
}

/// Everything learned about one pair.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    /// `{net}:{user}~{net}:{user}`
    pub pair_id: String,
    pub first: String,
    pub second: String,
    pub features: FeatureBreakdown,
    pub prediction: Option<Prediction>,
    pub notes: Vec<PairNote>,
}

impl PairOutcome {
    pub fn notes_text(&self) -> String {
        self.notes
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Whether and how pairs get a verdict.
#[derive(Clone)]
pub enum ClassifierState {
    /// Verdicts are not wanted (`--no-classify`)
    Disabled,
    Ready(MatchClassifier),
    /// The model could not be loaded; every pair gets a note instead
    Failed(String),
}

impl ClassifierState {
    pub fn from_load(result: Result<MatchClassifier, ClassifierError>) -> Self {
        match result {
            Ok(classifier) => ClassifierState::Ready(classifier),
            Err(e) => {
                warn!(error = %e, "Classifier unavailable; pairs will be reported without a verdict");
                ClassifierState::Failed(e.to_string())
            }
        }
    }
}

pub struct PairEvaluator {
    builder: FeatureVectorBuilder,
    classifier: ClassifierState,
    sink: Option<Arc<dyn ReportSink>>,
}

impl PairEvaluator {
    pub fn new(builder: FeatureVectorBuilder, classifier: ClassifierState) -> Self {
        Self {
            builder,
            classifier,
            sink: None,
        }
    }

    /// Append profile and prediction rows for every evaluated pair.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Load both accounts from `source` and evaluate them.
    pub async fn evaluate_refs(
        &self,
        source: &dyn ProfileSource,
        first: &ProfileRef,
        second: &ProfileRef,
    ) -> Result<PairOutcome> {
        let a = source.fetch_bundle(first).await?;
        let b = source.fetch_bundle(second).await?;
        self.evaluate(&a, &b).await
    }

    pub async fn evaluate(&self, first: &ProfileBundle, second: &ProfileBundle) -> Result<PairOutcome> {
        self.evaluate_at(first, second, Utc::now()).await
    }

    /// Evaluate with an explicit "now" for segment windows.
    ///
    /// Only a report-sink failure is an error; every scoring problem is a note.
    pub async fn evaluate_at(
        &self,
        first: &ProfileBundle,
        second: &ProfileBundle,
        now: DateTime<Utc>,
    ) -> Result<PairOutcome> {
        let first_name = account_name(first);
        let second_name = account_name(second);
        let pair_id = format!("{first_name}~{second_name}");
        // The same pair may be evaluated more than once at a time (a batch
        // manifest can repeat it); each run gets its own segment artifacts.
        let artifact_key = format!("{pair_id}#{}", EVALUATION_SEQ.fetch_add(1, Ordering::Relaxed));

        let features = self.builder.build(&artifact_key, first, second, now).await;
        let mut notes = collect_notes(first, second, &features);

        let prediction = match &self.classifier {
            ClassifierState::Disabled => None,
            ClassifierState::Failed(reason) => {
                notes.push(PairNote::ClassifierUnavailable {
                    reason: reason.clone(),
                });
                None
            }
            ClassifierState::Ready(classifier) => match classifier.classify(&features.vector) {
                Ok(p) => Some(p),
                Err(e) => {
                    notes.push(PairNote::ClassifierUnavailable {
                        reason: e.to_string(),
                    });
                    None
                }
            },
        };

        for note in &notes {
            warn!(pair = %pair_id, note = %note, "Degraded signal");
        }

        let outcome = PairOutcome {
            pair_id,
            first: first_name,
            second: second_name,
            features,
            prediction,
            notes,
        };

        match &outcome.prediction {
            Some(p) => info!(
                pair = %outcome.pair_id,
                label = p.label,
                prob1 = p.prob1,
                "Pair classified"
            ),
            None => info!(pair = %outcome.pair_id, "Pair evaluated without verdict"),
        }

        if let Some(sink) = &self.sink {
            write_report(sink.as_ref(), first, second, &outcome).await?;
        }

        Ok(outcome)
    }
}

fn account_name(bundle: &ProfileBundle) -> String {
    format!("{}:{}", bundle.source_name, bundle.user_id())
}

fn collect_notes(first: &ProfileBundle, second: &ProfileBundle, features: &FeatureBreakdown) -> Vec<PairNote> {
    let mut notes = Vec::new();

    for bundle in [first, second] {
        if bundle.posts.is_empty() {
            notes.push(PairNote::MissingPosts {
                account: account_name(bundle),
            });
        }
    }
    for bundle in [first, second] {
        if bundle.profile.friends.is_empty() {
            notes.push(PairNote::MissingFriends {
                account: account_name(bundle),
            });
        }
    }

    for (location, reason) in &features.distance.unresolved {
        notes.push(PairNote::UnresolvableLocation {
            location: location.clone(),
            reason: reason.clone(),
        });
    }

    let mut segment_failures = 0;
    if let Some((a, b)) = &features.segmentation {
        for (index, reason) in a.failed.iter().chain(&b.failed) {
            segment_failures += 1;
            notes.push(PairNote::ExternalService {
                service: "topic-engine".to_string(),
                detail: format!("segment {index}: {reason}"),
            });
        }
    }

    match &features.topic {
        TopicSignal::NoCommonData => notes.push(PairNote::NoCommonSegments),
        // Segment failures are already noted one by one
        TopicSignal::Unavailable(reason) if segment_failures == 0 => {
            notes.push(PairNote::ExternalService {
                service: "topic-engine".to_string(),
                detail: reason.clone(),
            })
        }
        TopicSignal::Unavailable(_) | TopicSignal::NotComputed | TopicSignal::Measured(_) => {}
    }

    notes
}

async fn write_report(
    sink: &dyn ReportSink,
    first: &ProfileBundle,
    second: &ProfileBundle,
    outcome: &PairOutcome,
) -> Result<()> {
    let (src1, src2) = (first.source_name.as_str(), second.source_name.as_str());

    sink.append_row(
        &rows::profile_sheet(src1, src2),
        &rows::profile_columns(src1, src2),
        &rows::profile_row(first, second),
    )
    .await?;

    sink.append_row(
        &rows::prediction_sheet(src1, src2),
        &rows::prediction_columns(src1, src2),
        &rows::prediction_row(
            first.user_id(),
            second.user_id(),
            outcome.prediction.as_ref(),
            &outcome.features.vector,
            outcome.features.topic.status(),
            &outcome.notes_text(),
        ),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_display() {
        assert_eq!(
            PairNote::MissingPosts { account: "facebook:alice".into() }.to_string(),
            "facebook:alice has no posts"
        );
        assert_eq!(PairNote::NoCommonSegments.to_string(), "no common time segments");
    }
}
