//! Answer matching for meaning tasks.
//!
//! Meaning answers tolerate typos: an answer is correct when its
//! Damerau-Levenshtein similarity to any accepted meaning reaches the
//! configured strictness threshold. Both sides are lowercased first.

use crate::types::Meaning;

/// Damerau-Levenshtein distance (optimal string alignment): edits are
/// insertion, deletion, substitution, and adjacent transposition.
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Three rows instead of the full matrix: the transposition case only
    // looks two rows back.
    let mut prev2 = vec![0usize; n + 1];
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;

        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };

            let mut best = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution

            if i > 1
                && j > 1
                && a_chars[i - 1] == b_chars[j - 2]
                && a_chars[i - 2] == b_chars[j - 1]
            {
                best = best.min(prev2[j - 2] + 1); // transposition
            }

            curr[j] = best;
        }

        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Normalized similarity (0.0 to 1.0) based on Damerau-Levenshtein distance.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0; // Both empty strings are identical
    }

    let distance = damerau_levenshtein(a, b);
    1.0 - (distance as f64 / max_len as f64)
}

/// Whether `answer` matches any accepted meaning at the given strictness.
pub fn meaning_is_correct(answer: &str, meanings: &[Meaning], strictness: f64) -> bool {
    let answer = answer.trim().to_lowercase();
    meanings.iter().any(|m| {
        m.accepted && normalized_similarity(&m.text.to_lowercase(), &answer) >= strictness
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_TYPO_STRICTNESS;

    fn meaning(text: &str, accepted: bool) -> Meaning {
        Meaning {
            text: text.to_string(),
            primary: accepted,
            accepted,
        }
    }

    #[test]
    fn test_damerau_levenshtein() {
        assert_eq!(damerau_levenshtein("", ""), 0);
        assert_eq!(damerau_levenshtein("abc", "abc"), 0);
        assert_eq!(damerau_levenshtein("abc", ""), 3);
        assert_eq!(damerau_levenshtein("", "abc"), 3);
        assert_eq!(damerau_levenshtein("kitten", "sitting"), 3);
        assert_eq!(damerau_levenshtein("saturday", "sunday"), 3);
    }

    #[test]
    fn transposition_counts_as_single_edit() {
        assert_eq!(damerau_levenshtein("person", "preson"), 1);
        assert_eq!(damerau_levenshtein("ab", "ba"), 1);
        // Plain Levenshtein would charge 2 for each of these.
    }

    #[test]
    fn test_normalized_similarity() {
        assert_eq!(normalized_similarity("abc", "abc"), 1.0);
        assert_eq!(normalized_similarity("", ""), 1.0);
        assert!(normalized_similarity("kitten", "sitting") > 0.5);
        assert!(normalized_similarity("abc", "xyz") < 0.5);
    }

    #[test]
    fn accepted_meaning_within_threshold_matches() {
        let meanings = vec![meaning("Person", true)];
        assert!(meaning_is_correct("person", &meanings, DEFAULT_TYPO_STRICTNESS));
        assert!(meaning_is_correct("PERSON", &meanings, DEFAULT_TYPO_STRICTNESS));
        // A transposed pair is one edit: 1 - 1/6 exceeds 0.8.
        assert!(meaning_is_correct("preson", &meanings, DEFAULT_TYPO_STRICTNESS));
    }

    #[test]
    fn distant_typo_is_rejected() {
        let meanings = vec![meaning("Person", true)];
        assert!(!meaning_is_correct("prsn", &meanings, DEFAULT_TYPO_STRICTNESS));
        assert!(!meaning_is_correct("human", &meanings, DEFAULT_TYPO_STRICTNESS));
    }

    #[test]
    fn unaccepted_meanings_never_match() {
        let meanings = vec![meaning("Ground", false)];
        assert!(!meaning_is_correct("ground", &meanings, DEFAULT_TYPO_STRICTNESS));
    }

    #[test]
    fn any_accepted_meaning_suffices() {
        let meanings = vec![meaning("Ground", true), meaning("Floor", true)];
        assert!(meaning_is_correct("floor", &meanings, DEFAULT_TYPO_STRICTNESS));
        assert!(meaning_is_correct("ground", &meanings, DEFAULT_TYPO_STRICTNESS));
    }
}
