//! Core types for the study session engine.

use serde::{Deserialize, Serialize};

/// Default working-set size for both review and lesson buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 5;

/// Default similarity threshold for meaning answers.
pub const DEFAULT_TYPO_STRICTNESS: f64 = 0.8;

/// Kind of learning item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Radical,
    Kanji,
    Vocabulary,
    KanaVocabulary,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Radical => "radical",
            Self::Kanji => "kanji",
            Self::Vocabulary => "vocabulary",
            Self::KanaVocabulary => "kana_vocabulary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "radical" => Some(Self::Radical),
            "kanji" => Some(Self::Kanji),
            "vocabulary" => Some(Self::Vocabulary),
            "kana_vocabulary" => Some(Self::KanaVocabulary),
            _ => None,
        }
    }

    /// Radicals and kana-only vocabulary carry no reading task; their
    /// reading is auto-passed everywhere.
    pub fn has_reading_task(&self) -> bool {
        matches!(self, Self::Kanji | Self::Vocabulary)
    }
}

/// A learning item as cached from the remote service. Immutable from the
/// engine's point of view; only the sync pull rewrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub kind: SubjectKind,
    /// Display glyphs. Absent for image-only radicals.
    pub characters: Option<String>,
    pub slug: String,
    pub level: i64,
    pub url: String,
    pub meaning_mnemonic: Option<String>,
    pub reading_mnemonic: Option<String>,
    pub hidden_at: Option<String>,
}

impl Subject {
    /// Printable form, falling back to the slug when the item has no glyph.
    pub fn display_characters(&self) -> &str {
        self.characters.as_deref().unwrap_or(&self.slug)
    }
}

/// One accepted or auxiliary meaning of a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meaning {
    pub text: String,
    pub primary: bool,
    pub accepted: bool,
}

/// One reading of a subject (kanji and vocabulary only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub text: String,
    pub primary: bool,
    pub accepted: bool,
    /// onyomi / kunyomi / nanori, present for kanji readings.
    pub kind: Option<String>,
}

/// Learner progress record binding a subject to SRS scheduling metadata.
/// Owned by the remote service; read-only to the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub subject_id: i64,
    pub srs_stage: i64,
    pub hidden: bool,
    pub available_at: Option<String>,
    pub started_at: Option<String>,
    pub unlocked_at: Option<String>,
}

/// Durable per-assignment quiz state. `created_at` transitions from
/// `None` to a timestamp exactly once, on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRow {
    pub assignment_id: i64,
    pub meaning_passed: bool,
    pub reading_passed: bool,
    pub incorrect_meaning_answers: i64,
    pub incorrect_reading_answers: i64,
    pub created_at: Option<String>,
}

impl ReviewRow {
    pub fn task_passed(&self, task: ReviewTask) -> bool {
        match task {
            ReviewTask::Meaning => self.meaning_passed,
            ReviewTask::Reading => self.reading_passed,
        }
    }
}

/// Review working-set entry. Pass state lives in the durable review row,
/// so the buffer only tracks identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewItem {
    pub assignment_id: i64,
    pub subject_id: i64,
}

/// Lesson working-set entry. Lesson pass/seen state is session-local and
/// discarded when the item leaves the buffer.
#[derive(Debug, Clone)]
pub struct LessonItem {
    pub assignment_id: i64,
    pub subject_id: i64,
    pub meaning_passed: bool,
    pub reading_passed: bool,
    pub seen: bool,
}

/// The two tasks an item must pass before its review completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTask {
    Meaning,
    Reading,
}

/// Outcome of adjudicating an answer. Precondition violations (answering
/// an already-passed task) are errors, not verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}
