//! Textual similarity used by clustering and feedback lookup.

use std::collections::BTreeSet;

/// Token-set Jaccard similarity between two free-text strings, in [0, 1].
pub fn jaccard(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Similarity between two question pairs, taking the better of the two
/// orderings so (a1, a2) vs (b2, b1) still matches.
pub fn pair_similarity(a1: &str, a2: &str, b1: &str, b2: &str) -> f64 {
    let straight = (jaccard(a1, b1) + jaccard(a2, b2)) / 2.0;
    let crossed = (jaccard(a1, b2) + jaccard(a2, b1)) / 2.0;
    straight.max(crossed)
}

fn token_set(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(jaccard("Will X win?", "will x win"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(jaccard("apple banana", "cherry date"), 0.0);
    }

    #[test]
    fn partial_overlap_scores_between() {
        let sim = jaccard("will x win the election", "will y win the election");
        assert!(sim > 0.5 && sim < 1.0);
    }

    #[test]
    fn pair_similarity_handles_swapped_order() {
        let sim = pair_similarity(
            "will x win",
            "will y win",
            "will y win",
            "will x win",
        );
        assert_eq!(sim, 1.0);
    }
}
