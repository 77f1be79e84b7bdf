// Time-segmented post bucketing.
//
// Walking back from "now" in fixed windows of `segment_days`, a single
// cursor moves through the (newest-first) post list. Posts newer than the
// current window's cutoff join that window; the walk stops at the first post
// at or before the cutoff and resumes there for the next window. Posts with
// no date are stepped over and never attributed. A window that collects no
// text produces no artifact at all, so its index is simply absent.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{SegmentKey, SegmentStore, TopicSegment};
use super::traits::TopicModelEngine;
use crate::profile::{ProfileBundle, UserPost};
use crate::services::ServiceGuard;

/// How posts are cut into windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentParams {
    /// Number of windows (default 10)
    pub segments: usize,
    /// Width of each window in days (default 37)
    pub segment_days: i64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            segments: 10,
            segment_days: 37,
        }
    }
}

/// The concatenated text of one non-empty window.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentText {
    /// 1-based, 1 = most recent window
    pub index: usize,
    pub text: String,
    pub post_count: usize,
}

/// Bucket posts into windows ending at `now`. Pure; no I/O.
pub fn bucket_posts(posts: &[UserPost], params: &SegmentParams, now: DateTime<Utc>) -> Vec<SegmentText> {
    let mut windows = Vec::new();
    let mut cursor = 0;

    for i in 0..params.segments {
        // A window reaching past the representable range takes every older post
        let cutoff = params
            .segment_days
            .checked_mul(i as i64 + 1)
            .and_then(Duration::try_days)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        if cursor >= posts.len() {
            break;
        }

        let mut texts: Vec<&str> = Vec::new();
        while cursor < posts.len() {
            let post = &posts[cursor];
            match post.post_date {
                None => cursor += 1,
                Some(date) if date > cutoff => {
                    let text = post.post_text.trim();
                    if !text.is_empty() {
                        texts.push(text);
                    }
                    cursor += 1;
                }
                Some(_) => break,
            }
        }

        if texts.is_empty() {
            continue;
        }

        windows.push(SegmentText {
            index: i + 1,
            post_count: texts.len(),
            text: texts.join("\n"),
        });
    }

    windows
}

/// What one segmentation run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentationSummary {
    /// Indices that now have an artifact in the store
    pub created: Vec<usize>,
    /// Indices whose text could not be modeled, with the reason
    pub failed: Vec<(usize, String)>,
}

/// Buckets a profile's posts and stores one topic model per non-empty window.
pub struct PostSegmenter {
    engine: Arc<dyn TopicModelEngine>,
    store: Arc<SegmentStore>,
    params: SegmentParams,
    guard: ServiceGuard,
}

impl PostSegmenter {
    pub fn new(
        engine: Arc<dyn TopicModelEngine>,
        store: Arc<SegmentStore>,
        params: SegmentParams,
        guard: ServiceGuard,
    ) -> Self {
        Self {
            engine,
            store,
            params,
            guard,
        }
    }

    pub fn params(&self) -> &SegmentParams {
        &self.params
    }

    /// Segment one side of a pair and store the resulting artifacts.
    pub async fn segment(
        &self,
        pair: &str,
        bundle: &ProfileBundle,
        now: DateTime<Utc>,
    ) -> SegmentationSummary {
        let mut summary = SegmentationSummary::default();
        let windows = bucket_posts(&bundle.posts, &self.params, now);

        debug!(
            pair,
            source = %bundle.source_name,
            user = bundle.user_id(),
            posts = bundle.posts.len(),
            windows = windows.len(),
            "Bucketed posts into time windows"
        );

        for window in windows {
            let key = SegmentKey::new(pair, &bundle.source_name, bundle.user_id(), window.index);

            if let Err(e) = self.store.persist_text(&key, &window.text) {
                warn!(pair, segment = window.index, error = %e, "Failed to persist segment text");
            }

            let engine = &self.engine;
            let text = &window.text;
            match self
                .guard
                .call("topic-engine", "build_model", || engine.build_model(text))
                .await
            {
                Ok(handle) => {
                    self.store.insert(
                        pair,
                        TopicSegment {
                            source_name: bundle.source_name.clone(),
                            user_id: bundle.user_id().to_string(),
                            segment_index: window.index,
                            handle,
                        },
                    );
                    summary.created.push(window.index);
                }
                Err(e) => {
                    warn!(
                        pair,
                        source = %bundle.source_name,
                        segment = window.index,
                        error = %e,
                        "Topic model unavailable for segment"
                    );
                    summary.failed.push((window.index, format!("{e:#}")));
                }
            }
        }

        summary
    }
}
