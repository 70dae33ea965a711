//! Core domain library shared by the torii study client.
//!
//! Provides:
//! - Typed entities for the local cache (subjects, assignments, reviews, lessons)
//! - Answer matching for meaning tasks (Damerau-Levenshtein similarity)
//! - Kana normalization for reading tasks (romaji transliteration)

pub mod kana;
pub mod matching;
pub mod types;

pub use kana::{normalize_reading, reading_is_correct};
pub use matching::{damerau_levenshtein, meaning_is_correct, normalized_similarity};
pub use types::{
    Assignment, LessonItem, Meaning, Reading, ReviewItem, ReviewRow, ReviewTask, Subject,
    SubjectKind, Verdict, DEFAULT_BUFFER_SIZE, DEFAULT_TYPO_STRICTNESS,
};
