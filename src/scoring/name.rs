// Display-name similarity with partial-token credit.
//
// Whole-token matches (case-insensitive) count 1 each. On top of that, the
// single best common-prefix ratio seen across every non-matching token pair
// is added once. The total is normalized by the longer token list, so
// "John Vicky" vs "Vicky" is 0.5 and "John Vicky" vs "Vicky John" is 1.0.
//
// The partial credit is one running maximum across all pairs, not a
// best-per-token sum. That is long-standing behavior the trained classifier
// has seen; keep it.

/// Score two display names in `[0, 1]`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.to_lowercase() == b.to_lowercase() {
        return 1.0;
    }

    let tokens_a: Vec<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let tokens_b: Vec<String> = b.split_whitespace().map(str::to_lowercase).collect();

    let longest = tokens_a.len().max(tokens_b.len());
    if longest == 0 {
        // Whitespace-only names
        return 0.0;
    }

    let mut matches = 0usize;
    let mut best_partial = 0.0f64;

    for w1 in &tokens_a {
        for w2 in &tokens_b {
            if w1 == w2 {
                matches += 1;
            } else {
                best_partial = best_partial.max(prefix_ratio(w1, w2));
            }
        }
    }

    ((matches as f64 + best_partial) / longest as f64).min(1.0)
}

/// Common-prefix length of two lowercase tokens over the longer token's
/// length, counted in chars.
fn prefix_ratio(w1: &str, w2: &str) -> f64 {
    let longer = w1.chars().count().max(w2.chars().count());
    if longer == 0 {
        return 0.0;
    }
    let common = w1
        .chars()
        .zip(w2.chars())
        .take_while(|(x, y)| x == y)
        .count();
    common as f64 / longer as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_name() {
        assert!((name_similarity("John Vicky", "Vicky") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_tokens() {
        assert_eq!(name_similarity("John Vicky", "Vicky John"), 1.0);
    }

    #[test]
    fn test_empty_side() {
        assert_eq!(name_similarity("", "X"), 0.0);
        assert_eq!(name_similarity("X", ""), 0.0);
    }

    #[test]
    fn test_case_insensitive_exact() {
        assert_eq!(name_similarity("alice SMITH", "Alice Smith"), 1.0);
    }

    #[test]
    fn test_prefix_credit() {
        // "Jon" vs "Jonathan": prefix 3 over 8
        let score = name_similarity("Jon", "Jonathan");
        assert!((score - 3.0 / 8.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_partial_credit_is_one_global_maximum() {
        // Whole match "smith" = 1, best partial is "kat"/"katherine" = 3/9
        let score = name_similarity("Kat Smith", "Katherine Smith");
        assert!((score - (1.0 + 3.0 / 9.0) / 2.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_whitespace_only_names() {
        assert_eq!(name_similarity("   ", "  "), 0.0);
    }

    #[test]
    fn test_never_exceeds_one() {
        // Duplicate tokens produce more matches than tokens
        let score = name_similarity("Ann Ann", "Ann Ann Lee");
        assert!(score <= 1.0);
    }
}
