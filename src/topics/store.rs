// Segment artifact store.
//
// Every TopicSegment is stored under (pair, source, user, index) so that
// pairs evaluated concurrently can't collide, even when the same account
// appears in several pairs. The store is owned by the evaluator and handed
// to both the segmenter and the similarity scorer.
//
// Optionally the raw segment text is also written to disk at
// `{dir}/{pair}/{source}/{user}/segment_{index}/{source}_segment_{index}.txt`
// for offline inspection.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};

use super::traits::ModelHandle;

/// Composite key for one segment artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
    pub pair: String,
    pub source_name: String,
    pub user_id: String,
    pub index: usize,
}

impl SegmentKey {
    pub fn new(pair: &str, source_name: &str, user_id: &str, index: usize) -> Self {
        Self {
            pair: pair.to_string(),
            source_name: source_name.to_string(),
            user_id: user_id.to_string(),
            index,
        }
    }

    /// `{source}/{user}/segment_{index}`, independent of the pair.
    pub fn artifact_path(&self) -> PathBuf {
        Path::new(&path_component(&self.source_name))
            .join(path_component(&self.user_id))
            .join(format!("segment_{}", self.index))
    }
}

/// One time window's keyword model for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSegment {
    pub source_name: String,
    pub user_id: String,
    /// 1-based window number, 1 = most recent
    pub segment_index: usize,
    pub handle: ModelHandle,
}

#[derive(Default)]
pub struct SegmentStore {
    segments: RwLock<HashMap<SegmentKey, TopicSegment>>,
    persist_dir: Option<PathBuf>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write segment text under `dir`.
    pub fn with_persist_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            segments: RwLock::default(),
            persist_dir: Some(dir.into()),
        }
    }

    pub fn insert(&self, pair: &str, segment: TopicSegment) {
        let key = SegmentKey::new(pair, &segment.source_name, &segment.user_id, segment.segment_index);
        self.segments
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, segment);
    }

    pub fn get(&self, key: &SegmentKey) -> Option<TopicSegment> {
        self.segments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Segment indices stored for one account within one pair.
    pub fn indices(&self, pair: &str, source_name: &str, user_id: &str) -> BTreeSet<usize> {
        self.segments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|k| k.pair == pair && k.source_name == source_name && k.user_id == user_id)
            .map(|k| k.index)
            .collect()
    }

    /// Remove and return every segment belonging to a pair.
    pub fn remove_pair(&self, pair: &str) -> Vec<TopicSegment> {
        let mut segments = self.segments.write().unwrap_or_else(|e| e.into_inner());
        let keys: Vec<SegmentKey> = segments.keys().filter(|k| k.pair == pair).cloned().collect();
        keys.into_iter().filter_map(|k| segments.remove(&k)).collect()
    }

    pub fn len(&self) -> usize {
        self.segments.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the segment text to disk if persistence is enabled.
    /// Returns the file written, if any.
    pub fn persist_text(&self, key: &SegmentKey, text: &str) -> Result<Option<PathBuf>> {
        let Some(root) = &self.persist_dir else {
            return Ok(None);
        };

        let dir = root.join(path_component(&key.pair)).join(key.artifact_path());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create segment directory {}", dir.display()))?;

        let file = dir.join(format!(
            "{}_segment_{}.txt",
            path_component(&key.source_name),
            key.index
        ));
        std::fs::write(&file, text)
            .with_context(|| format!("Failed to write segment text {}", file.display()))?;
        Ok(Some(file))
    }
}

/// Make an id safe to use as a single path component on every platform.
fn path_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(source: &str, user: &str, index: usize) -> TopicSegment {
        TopicSegment {
            source_name: source.to_string(),
            user_id: user.to_string(),
            segment_index: index,
            handle: ModelHandle::new(index as u64),
        }
    }

    #[test]
    fn test_artifact_path_layout() {
        let key = SegmentKey::new("p1", "facebook", "alice", 3);
        assert_eq!(
            key.artifact_path(),
            Path::new("facebook").join("alice").join("segment_3")
        );
    }

    #[test]
    fn test_pairs_do_not_collide() {
        let store = SegmentStore::new();
        store.insert("pair-a", segment("twitter", "bob", 1));
        store.insert("pair-b", segment("twitter", "bob", 2));

        assert_eq!(store.indices("pair-a", "twitter", "bob"), BTreeSet::from([1]));
        assert_eq!(store.indices("pair-b", "twitter", "bob"), BTreeSet::from([2]));

        let removed = store.remove_pair("pair-a");
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_by_key() {
        let store = SegmentStore::new();
        store.insert("p", segment("facebook", "alice", 4));
        let key = SegmentKey::new("p", "facebook", "alice", 4);
        assert_eq!(store.get(&key).unwrap().segment_index, 4);
        assert!(store.get(&SegmentKey::new("p", "facebook", "alice", 5)).is_none());
    }

    #[test]
    fn test_persist_disabled_writes_nothing() {
        let store = SegmentStore::new();
        let key = SegmentKey::new("p", "facebook", "alice", 1);
        assert!(store.persist_text(&key, "text").unwrap().is_none());
    }

    #[test]
    fn test_persist_writes_segment_file() {
        let root = std::env::temp_dir().join(format!("crossmatch-store-{}", std::process::id()));
        let store = SegmentStore::with_persist_dir(&root);
        let key = SegmentKey::new("facebook:alice~twitter:al", "facebook", "alice", 2);

        let file = store.persist_text(&key, "hello").unwrap().unwrap();
        assert!(file.ends_with(Path::new("segment_2").join("facebook_segment_2.txt")));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "hello");

        let _ = std::fs::remove_dir_all(&root);
    }
}
