// Directional friend-list overlap.
//
// Friend lists hold display names, not ids, so matching is by
// case-insensitive name. Each side counts how many of its own entries have
// at least one match on the other side; duplicates on the counting side are
// counted again. The product of the two counts, scaled by ALPHA and divided
// by the product of the list lengths, is the raw score.
//
// The raw score is not clamped here. Empty lists divide by zero, so the
// feature builder owns both the empty-list case and the clamp to 1.0.

use std::collections::HashSet;

/// Scale factor applied to the overlap product.
pub const ALPHA: f64 = 70.0;

/// Result of one overlap computation, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FriendOverlap {
    /// Entries of the first list found in the second
    pub count_a: usize,
    /// Entries of the second list found in the first
    pub count_b: usize,
    /// `ALPHA * count_a * count_b / (len_a * len_b)`; 0.0 when either list is empty
    pub raw_score: f64,
}

impl FriendOverlap {
    /// The value that goes into the feature vector: raw score clamped to 1.0.
    pub fn clamped(&self) -> f64 {
        self.raw_score.min(1.0)
    }
}

/// Raw overlap score in `[0, ALPHA]`.
///
/// Callers must handle empty lists; this returns 0.0 for them instead of
/// dividing by zero.
pub fn friend_overlap(friends_a: &[String], friends_b: &[String]) -> FriendOverlap {
    let lower_a: HashSet<String> = friends_a.iter().map(|f| f.to_lowercase()).collect();
    let lower_b: HashSet<String> = friends_b.iter().map(|f| f.to_lowercase()).collect();

    let count_a = friends_a
        .iter()
        .filter(|f| lower_b.contains(&f.to_lowercase()))
        .count();
    let count_b = friends_b
        .iter()
        .filter(|f| lower_a.contains(&f.to_lowercase()))
        .count();

    let raw_score = if friends_a.is_empty() || friends_b.is_empty() {
        0.0
    } else {
        ALPHA * (count_a * count_b) as f64 / (friends_a.len() * friends_b.len()) as f64
    };

    FriendOverlap {
        count_a,
        count_b,
        raw_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_shared_friend() {
        let overlap = friend_overlap(&names(&["A", "B"]), &names(&["a", "c"]));
        assert_eq!(overlap.count_a, 1);
        assert_eq!(overlap.count_b, 1);
        assert!((overlap.raw_score - 17.5).abs() < 1e-9);
        assert_eq!(overlap.clamped(), 1.0);
    }

    #[test]
    fn test_full_overlap_hits_alpha() {
        let overlap = friend_overlap(&names(&["A", "B", "C"]), &names(&["c", "b", "a"]));
        assert!((overlap.raw_score - ALPHA).abs() < 1e-9);
        assert_eq!(overlap.clamped(), 1.0);
    }

    #[test]
    fn test_no_overlap() {
        let overlap = friend_overlap(&names(&["A"]), &names(&["B"]));
        assert_eq!(overlap.raw_score, 0.0);
    }

    #[test]
    fn test_small_overlap_stays_below_one() {
        // 1 shared out of 10 x 10: 70 * 1 / 100 = 0.7
        let a: Vec<String> = (0..10).map(|i| format!("a{i}")).collect();
        let mut b: Vec<String> = (0..10).map(|i| format!("b{i}")).collect();
        b[0] = "A0".to_string();
        let overlap = friend_overlap(&a, &b);
        assert!((overlap.raw_score - 0.7).abs() < 1e-9);
        assert!((overlap.clamped() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_duplicates_on_counting_side_count_twice() {
        let overlap = friend_overlap(&names(&["Bob", "bob"]), &names(&["BOB"]));
        assert_eq!(overlap.count_a, 2);
        assert_eq!(overlap.count_b, 1);
    }

    #[test]
    fn test_empty_list_is_zero() {
        let overlap = friend_overlap(&[], &names(&["A"]));
        assert_eq!(overlap.raw_score, 0.0);
    }
}
