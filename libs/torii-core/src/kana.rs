//! Kana normalization for reading tasks.
//!
//! Reading answers are exact-match only: romanized input is transliterated
//! to kana first, then compared verbatim against the accepted readings.

use crate::types::Reading;
use wana_kana::ConvertJapanese;

/// Normalize a typed reading answer: trim, lowercase, and transliterate
/// romaji to hiragana. Kana input passes through unchanged.
pub fn normalize_reading(input: &str) -> String {
    // Uppercase romaji would otherwise convert to katakana.
    input.trim().to_lowercase().to_kana()
}

/// Whether `answer`, post kana-normalization, exactly equals an accepted
/// reading of the subject.
pub fn reading_is_correct(answer: &str, readings: &[Reading]) -> bool {
    let answer = normalize_reading(answer);
    readings.iter().any(|r| r.accepted && r.text == answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reading(text: &str, accepted: bool) -> Reading {
        Reading {
            text: text.to_string(),
            primary: accepted,
            accepted,
            kind: None,
        }
    }

    #[test]
    fn romaji_transliterates_to_hiragana() {
        assert_eq!(normalize_reading("jin"), "じん");
        assert_eq!(normalize_reading("ka"), "か");
        assert_eq!(normalize_reading("kyou"), "きょう");
    }

    #[test]
    fn kana_input_passes_through() {
        assert_eq!(normalize_reading("じん"), "じん");
    }

    #[test]
    fn uppercase_normalizes_like_lowercase() {
        assert_eq!(normalize_reading("JIN"), normalize_reading("jin"));
    }

    #[test]
    fn exact_match_after_normalization() {
        let readings = vec![reading("じん", true), reading("にん", true)];
        assert!(reading_is_correct("jin", &readings));
        assert!(reading_is_correct("にん", &readings));
        assert!(!reading_is_correct("じ", &readings));
        // No fuzzy tolerance on readings.
        assert!(!reading_is_correct("jinsei", &readings));
    }

    #[test]
    fn unaccepted_readings_never_match() {
        let readings = vec![reading("じん", false)];
        assert!(!reading_is_correct("jin", &readings));
    }
}
