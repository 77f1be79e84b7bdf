// Topic extraction and comparison over time-segmented post histories.
//
// Posts are bucketed into backward-looking windows, each window gets a
// keyword model from the TopicModelEngine port, and aligned windows from two
// accounts are compared by keyword overlap.

pub mod segmenter;
pub mod similarity;
pub mod store;
pub mod tfidf;
pub mod traits;

pub use segmenter::{bucket_posts, PostSegmenter, SegmentParams, SegmentText, SegmentationSummary};
pub use similarity::{
    count_matches, SegmentComparison, SegmentOwner, TopicSimilarity, TopicSimilarityReport,
    TopicSimilarityScorer,
};
pub use store::{SegmentKey, SegmentStore, TopicSegment};
pub use tfidf::TfIdfEngine;
pub use traits::{ModelHandle, TopicModelEngine};
