// Feature vector assembly for one profile pair.
//
// The classifier was trained on a fixed positional layout:
//
//   [label, bias, topicSimilarity, nameSimilarity, friendSimilarity, bestDistance]
//
// The label slot is -1 at inference time and is stripped before prediction.
// Slot order must never change.
//
// Missing-data policy:
//   - no posts on either side   -> topic = -1.0, topic scorer not called
//   - no friends on either side -> friend = 0.0 (not the sentinel)
//   - unresolvable locations    -> distance = -1.0 from the resolver
//   - topic engine failure      -> topic = -1.0, whether it failed while
//                                  building a segment model or listing keywords
//   - no common segments        -> topic = 0.0, but tagged so the report
//                                  can tell it apart from a measured 0.0

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::friends::{friend_overlap, FriendOverlap};
use super::name::name_similarity;
use crate::geo::{DistanceReport, GeoDistanceResolver};
use crate::profile::ProfileBundle;
use crate::services::ServiceGuard;
use crate::topics::{
    PostSegmenter, SegmentComparison, SegmentOwner, SegmentParams, SegmentStore,
    SegmentationSummary, TopicModelEngine, TopicSimilarity, TopicSimilarityScorer,
};

/// Placeholder label at inference time.
pub const UNKNOWN_LABEL: f64 = -1.0;
/// Sentinel for a feature that could not be computed.
pub const NOT_COMPUTED: f64 = -1.0;
/// Constant bias slot.
pub const BIAS: f64 = 0.0;

/// The six-slot vector, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub label: f64,
    pub bias: f64,
    pub topic_similarity: f64,
    pub name_similarity: f64,
    pub friend_similarity: f64,
    pub best_distance: f64,
}

impl FeatureVector {
    pub fn new(topic_similarity: f64, name_similarity: f64, friend_similarity: f64, best_distance: f64) -> Self {
        Self {
            label: UNKNOWN_LABEL,
            bias: BIAS,
            topic_similarity,
            name_similarity,
            friend_similarity,
            best_distance,
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.label,
            self.bias,
            self.topic_similarity,
            self.name_similarity,
            self.friend_similarity,
            self.best_distance,
        ]
    }

    /// The five slots the classifier sees: everything but the label.
    pub fn classifier_input(&self) -> [f64; 5] {
        [
            self.bias,
            self.topic_similarity,
            self.name_similarity,
            self.friend_similarity,
            self.best_distance,
        ]
    }
}

/// How the topic slot was obtained. Collapses to a number only in the vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TopicSignal {
    /// One side had no posts; the scorer was never called
    NotComputed,
    NoCommonData,
    Unavailable(String),
    Measured(f64),
}

impl TopicSignal {
    pub fn feature_value(&self) -> f64 {
        match self {
            TopicSignal::NotComputed | TopicSignal::Unavailable(_) => NOT_COMPUTED,
            TopicSignal::NoCommonData => 0.0,
            TopicSignal::Measured(v) => *v,
        }
    }

    /// Short status tag for reports.
    pub fn status(&self) -> &'static str {
        match self {
            TopicSignal::NotComputed => "not_computed",
            TopicSignal::NoCommonData => "no_common_data",
            TopicSignal::Unavailable(_) => "unavailable",
            TopicSignal::Measured(_) => "measured",
        }
    }
}

impl From<TopicSimilarity> for TopicSignal {
    fn from(value: TopicSimilarity) -> Self {
        match value {
            TopicSimilarity::NoCommonData => TopicSignal::NoCommonData,
            TopicSimilarity::Unavailable(reason) => TopicSignal::Unavailable(reason),
            TopicSimilarity::Measured(v) => TopicSignal::Measured(v),
        }
    }
}

impl fmt::Display for TopicSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicSignal::NotComputed => write!(f, "not computed"),
            TopicSignal::NoCommonData => write!(f, "no common data"),
            TopicSignal::Unavailable(reason) => write!(f, "unavailable ({reason})"),
            TopicSignal::Measured(v) => write!(f, "{v:.4}"),
        }
    }
}

/// The vector plus everything that went into it.
#[derive(Debug, Clone)]
pub struct FeatureBreakdown {
    pub vector: FeatureVector,
    pub topic: TopicSignal,
    pub topic_comparisons: Vec<SegmentComparison>,
    /// Segmentation of each side, when the topic scorer ran
    pub segmentation: Option<(SegmentationSummary, SegmentationSummary)>,
    /// `None` when either friend list is empty
    pub friends: Option<FriendOverlap>,
    pub distance: DistanceReport,
}

/// Runs every scorer for one pair and lays the results out in training order.
pub struct FeatureVectorBuilder {
    engine: Arc<dyn TopicModelEngine>,
    store: Arc<SegmentStore>,
    segmenter: PostSegmenter,
    topics: TopicSimilarityScorer,
    geo: GeoDistanceResolver,
}

impl FeatureVectorBuilder {
    pub fn new(
        engine: Arc<dyn TopicModelEngine>,
        store: Arc<SegmentStore>,
        geo: GeoDistanceResolver,
        params: SegmentParams,
        top_k: usize,
        guard: ServiceGuard,
    ) -> Self {
        let segmenter = PostSegmenter::new(engine.clone(), store.clone(), params, guard);
        let topics = TopicSimilarityScorer::new(engine.clone(), store.clone(), top_k, guard);
        Self {
            engine,
            store,
            segmenter,
            topics,
            geo,
        }
    }

    /// Build the vector for `first` vs `second`. `pair` keys this
    /// evaluation's segment artifacts and must be unique among evaluations
    /// sharing the store; they are released before returning.
    pub async fn build(
        &self,
        pair: &str,
        first: &ProfileBundle,
        second: &ProfileBundle,
        now: DateTime<Utc>,
    ) -> FeatureBreakdown {
        let (topic, topic_comparisons, segmentation) =
            if first.posts.is_empty() || second.posts.is_empty() {
                (TopicSignal::NotComputed, Vec::new(), None)
            } else {
                let seg_a = self.segmenter.segment(pair, first, now).await;
                let seg_b = self.segmenter.segment(pair, second, now).await;

                // Any segment the engine couldn't model makes the whole topic
                // signal unknown, not a score over the segments that remain.
                let failure = seg_a
                    .failed
                    .iter()
                    .chain(&seg_b.failed)
                    .next()
                    .map(|(index, reason)| format!("segment {index}: {reason}"));

                let (topic, comparisons) = match failure {
                    Some(reason) => {
                        warn!(pair, reason = %reason, "Topic engine unavailable; topic similarity unknown");
                        (TopicSignal::Unavailable(reason), Vec::new())
                    }
                    None => {
                        let report = self
                            .topics
                            .score(
                                pair,
                                SegmentOwner {
                                    source_name: &first.source_name,
                                    user_id: first.user_id(),
                                },
                                SegmentOwner {
                                    source_name: &second.source_name,
                                    user_id: second.user_id(),
                                },
                            )
                            .await;
                        (TopicSignal::from(report.similarity), report.comparisons)
                    }
                };
                self.release_pair(pair).await;
                (topic, comparisons, Some((seg_a, seg_b)))
            };

        let name = name_similarity(&second.profile.display_name, &first.profile.display_name);

        let friends = if first.profile.friends.is_empty() || second.profile.friends.is_empty() {
            None
        } else {
            Some(friend_overlap(&first.profile.friends, &second.profile.friends))
        };
        let friend_value = friends.map(|f| f.clamped()).unwrap_or(0.0);

        let distance = self.geo.best_distance(&first.profile, &second.profile).await;

        let vector = FeatureVector::new(
            topic.feature_value(),
            name,
            friend_value,
            distance.best_distance(),
        );

        debug!(pair, vector = ?vector.as_array(), topic = %topic, "Built feature vector");

        FeatureBreakdown {
            vector,
            topic,
            topic_comparisons,
            segmentation,
            friends,
            distance,
        }
    }

    /// Drop this pair's stored segments and free their engine models.
    async fn release_pair(&self, pair: &str) {
        for segment in self.store.remove_pair(pair) {
            self.engine.release(&segment.handle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_order() {
        let v = FeatureVector::new(0.3, 0.5, 0.7, 12.0);
        assert_eq!(v.as_array(), [-1.0, 0.0, 0.3, 0.5, 0.7, 12.0]);
        assert_eq!(v.classifier_input(), [0.0, 0.3, 0.5, 0.7, 12.0]);
    }

    #[test]
    fn test_topic_signal_values() {
        assert_eq!(TopicSignal::NotComputed.feature_value(), -1.0);
        assert_eq!(TopicSignal::Unavailable("down".into()).feature_value(), -1.0);
        assert_eq!(TopicSignal::NoCommonData.feature_value(), 0.0);
        assert_eq!(TopicSignal::Measured(0.42).feature_value(), 0.42);
    }

    #[test]
    fn test_no_common_data_is_tagged_not_measured() {
        let signal = TopicSignal::from(TopicSimilarity::NoCommonData);
        assert_ne!(signal, TopicSignal::Measured(0.0));
        assert_eq!(signal.status(), "no_common_data");
    }
}
