// Unit tests for the scoring layer: name similarity, friend overlap and the
// feature vector builder's missing-data policy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crossmatch::geo::{GeoDistanceResolver, NoopGeocoder};
use crossmatch::profile::{ProfileBundle, UserPost, UserProfile};
use crossmatch::scoring::features::{FeatureVector, FeatureVectorBuilder, TopicSignal};
use crossmatch::scoring::friends::{friend_overlap, ALPHA};
use crossmatch::scoring::name::name_similarity;
use crossmatch::services::ServiceGuard;
use crossmatch::topics::{ModelHandle, SegmentParams, SegmentStore, TfIdfEngine, TopicModelEngine};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Keywords are the document's words; any document mentioning `refuse`
/// cannot be modelled.
struct PickyEngine {
    refuse: &'static str,
    docs: Mutex<HashMap<u64, String>>,
    next: AtomicU64,
}

impl PickyEngine {
    fn refusing(refuse: &'static str) -> Self {
        Self {
            refuse,
            docs: Mutex::new(HashMap::new()),
            next: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl TopicModelEngine for PickyEngine {
    async fn build_model(&self, document: &str) -> Result<ModelHandle> {
        if document.contains(self.refuse) {
            anyhow::bail!("topic engine is down");
        }
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.docs.lock().unwrap().insert(id, document.to_string());
        Ok(ModelHandle::new(id))
    }

    async fn top_keywords(&self, handle: &ModelHandle, k: usize) -> Result<Vec<String>> {
        let docs = self.docs.lock().unwrap();
        let doc = docs
            .get(&handle.id())
            .ok_or_else(|| anyhow::anyhow!("unknown handle"))?;
        Ok(doc.split_whitespace().take(k).map(String::from).collect())
    }
}

fn builder() -> FeatureVectorBuilder {
    builder_with(Arc::new(TfIdfEngine::default()))
}

fn builder_with(engine: Arc<dyn TopicModelEngine>) -> FeatureVectorBuilder {
    let guard = ServiceGuard::default();
    FeatureVectorBuilder::new(
        engine,
        Arc::new(SegmentStore::new()),
        GeoDistanceResolver::new(Arc::new(NoopGeocoder), guard),
        SegmentParams::default(),
        50,
        guard,
    )
}

fn bundle(source: &str, name: &str, friends: &[&str], posts: Vec<UserPost>) -> ProfileBundle {
    ProfileBundle::new(
        source,
        UserProfile {
            user_id: name.to_lowercase().replace(' ', "."),
            display_name: name.to_string(),
            friends: names(friends),
            ..Default::default()
        },
        posts,
    )
}

fn recent_post(text: &str) -> UserPost {
    UserPost {
        post_text: text.to_string(),
        post_date: Some(chrono::Utc::now() - chrono::Duration::days(1)),
        ..Default::default()
    }
}

// ============================================================
// Name similarity
// ============================================================

#[test]
fn name_one_of_two_tokens_matches() {
    assert_eq!(name_similarity("John Vicky", "Vicky"), 0.5);
}

#[test]
fn name_reordered_tokens_are_full_match() {
    assert_eq!(name_similarity("John Vicky", "Vicky John"), 1.0);
}

#[test]
fn name_empty_side_is_zero() {
    assert_eq!(name_similarity("", "X"), 0.0);
    assert_eq!(name_similarity("X", ""), 0.0);
}

#[test]
fn name_case_insensitive_exact_match() {
    assert_eq!(name_similarity("alice SMITH", "Alice Smith"), 1.0);
}

#[test]
fn name_partial_prefix_credit() {
    // "kat" vs "katherine": prefix 3 over 9, no whole-token match
    let score = name_similarity("Kat", "Katherine");
    assert!((score - 3.0 / 9.0).abs() < 1e-12);
}

#[test]
fn name_score_is_never_above_one() {
    assert!(name_similarity("Ann Ann", "Ann Ann Ann") <= 1.0);
}

// ============================================================
// Friend overlap
// ============================================================

#[test]
fn friend_overlap_partial() {
    let overlap = friend_overlap(&names(&["A", "B"]), &names(&["a", "c"]));
    assert_eq!(overlap.count_a, 1);
    assert_eq!(overlap.count_b, 1);
    assert_eq!(overlap.raw_score, 17.5);
    assert_eq!(overlap.clamped(), 1.0);
}

#[test]
fn friend_overlap_full_is_alpha() {
    let overlap = friend_overlap(&names(&["x", "y", "z"]), &names(&["Z", "Y", "X"]));
    assert_eq!(overlap.raw_score, ALPHA);
    assert_eq!(overlap.clamped(), 1.0);
}

#[test]
fn friend_overlap_disjoint_is_zero() {
    let overlap = friend_overlap(&names(&["a"]), &names(&["b"]));
    assert_eq!(overlap.raw_score, 0.0);
}

#[test]
fn friend_overlap_duplicates_count_again() {
    // Both "bob" entries on side A find a match
    let overlap = friend_overlap(&names(&["bob", "bob", "eve"]), &names(&["Bob"]));
    assert_eq!(overlap.count_a, 2);
    assert_eq!(overlap.count_b, 1);
    assert!((overlap.raw_score - ALPHA * 2.0 / 3.0).abs() < 1e-12);
}

// ============================================================
// Feature vector builder
// ============================================================

#[tokio::test]
async fn empty_posts_on_either_side_is_topic_sentinel() {
    let b = builder();
    let with_posts = bundle("facebook", "Alice", &["Bob"], vec![recent_post("rust tokio")]);
    let without = bundle("twitter", "Alice", &["Bob"], vec![]);

    let one = b.build("p1", &with_posts, &without, chrono::Utc::now()).await;
    assert_eq!(one.vector.topic_similarity, -1.0);
    assert_eq!(one.topic, TopicSignal::NotComputed);

    let other = b.build("p2", &without, &with_posts, chrono::Utc::now()).await;
    assert_eq!(other.vector.topic_similarity, -1.0);
}

#[tokio::test]
async fn empty_friends_on_either_side_is_zero_not_sentinel() {
    let b = builder();
    let friendly = bundle("facebook", "Alice", &["Bob"], vec![]);
    let lonely = bundle("twitter", "Alice", &[], vec![]);

    let a = b.build("p1", &friendly, &lonely, chrono::Utc::now()).await;
    assert_eq!(a.vector.friend_similarity, 0.0);
    assert!(a.friends.is_none());

    let c = b.build("p2", &lonely, &friendly, chrono::Utc::now()).await;
    assert_eq!(c.vector.friend_similarity, 0.0);
}

#[tokio::test]
async fn unresolvable_locations_pass_distance_sentinel_through() {
    let b = builder();
    let mut first = bundle("facebook", "Alice", &[], vec![]);
    first.profile.current_location = "Paris".to_string();
    let mut second = bundle("twitter", "Alice", &[], vec![]);
    second.profile.current_location = "Berlin".to_string();

    let built = b.build("p", &first, &second, chrono::Utc::now()).await;
    assert_eq!(built.vector.best_distance, -1.0);
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn dated_post(text: &str, days_ago: i64) -> UserPost {
    UserPost {
        post_text: text.to_string(),
        post_date: Some(fixed_now() - chrono::Duration::days(days_ago)),
        ..Default::default()
    }
}

#[tokio::test]
async fn topic_model_build_failure_is_unknown_not_no_data() {
    let b = builder_with(Arc::new(PickyEngine::refusing("")));
    let first = bundle("facebook", "Alice", &[], vec![dated_post("rust tokio", 1)]);
    let second = bundle("twitter", "Alice", &[], vec![dated_post("rust serde", 2)]);

    let built = b.build("p", &first, &second, fixed_now()).await;
    assert_eq!(built.vector.topic_similarity, -1.0);
    assert!(matches!(built.topic, TopicSignal::Unavailable(_)));
    assert!(built.topic_comparisons.is_empty());
}

#[tokio::test]
async fn one_failed_segment_makes_topic_unknown() {
    let b = builder_with(Arc::new(PickyEngine::refusing("gardening")));
    // Segment 1 models fine on both sides; segment 2 fails on the first side
    let first = bundle(
        "facebook",
        "Alice",
        &[],
        vec![dated_post("rust tokio", 1), dated_post("gardening tomatoes", 45)],
    );
    let second = bundle(
        "twitter",
        "Alice",
        &[],
        vec![dated_post("rust tokio", 2), dated_post("knitting wool", 50)],
    );

    let built = b.build("p", &first, &second, fixed_now()).await;
    assert_eq!(built.vector.topic_similarity, -1.0);
    match &built.topic {
        TopicSignal::Unavailable(reason) => assert!(reason.contains("segment 2"), "{reason}"),
        other => panic!("expected unavailable topic signal, got {other:?}"),
    }
    let (seg_a, seg_b) = built.segmentation.as_ref().unwrap();
    assert_eq!(seg_a.created, vec![1]);
    assert_eq!(seg_a.failed.len(), 1);
    assert_eq!(seg_b.created, vec![1, 2]);
}

#[test]
fn vector_layout_is_fixed() {
    let v = FeatureVector::new(0.1, 0.2, 0.3, 0.4);
    assert_eq!(v.as_array(), [-1.0, 0.0, 0.1, 0.2, 0.3, 0.4]);
    assert_eq!(v.classifier_input(), [0.0, 0.1, 0.2, 0.3, 0.4]);
}
