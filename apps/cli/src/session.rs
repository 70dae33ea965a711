//! Session context: owns the store and both engines, applies the answer
//! verification rules, and assembles full card data for display.
//!
//! The session is an explicit dependency handed to whoever drives the quiz
//! loop, never a global, so each test constructs its own isolated instance.

use crate::config::Preferences;
use crate::db::Store;
use crate::engine::{EngineError, LessonEngine, ReviewEngine};
use chrono::{SecondsFormat, Utc};
use torii_core::types::{
    Assignment, LessonItem, Meaning, Reading, ReviewRow, ReviewTask, Subject, Verdict,
};
use torii_core::{kana, matching};

/// Metadata key holding the learner's level from the last pull.
pub const USER_LEVEL_META: &str = "user_level";

/// Everything the presentation layer needs to render one item.
#[derive(Debug, Clone)]
pub struct Card {
    pub subject: Subject,
    pub assignment: Assignment,
    pub meanings: Vec<Meaning>,
    pub readings: Vec<Reading>,
    pub components: Vec<Subject>,
    pub amalgamations: Vec<Subject>,
}

pub struct Session {
    store: Store,
    reviews: ReviewEngine,
    lessons: LessonEngine,
    strictness: f64,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Session {
    pub fn new(store: Store, prefs: &Preferences) -> Result<Self, EngineError> {
        let level = store
            .get_meta(USER_LEVEL_META)?
            .and_then(|v| v.parse::<i64>().ok());
        Ok(Self {
            store,
            reviews: ReviewEngine::new(prefs.review_buffer_size),
            lessons: LessonEngine::new(prefs.lesson_buffer_size, level),
            strictness: prefs.typo_strictness,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Re-read the learner's level and bring both buffers up to date.
    /// Called after every successful pull and on startup.
    pub fn refresh(&mut self) -> Result<(), EngineError> {
        let level = self
            .store
            .get_meta(USER_LEVEL_META)?
            .and_then(|v| v.parse::<i64>().ok());
        self.lessons.set_level(level);
        self.reviews.refresh(&self.store, &now_timestamp())?;
        self.lessons.refresh(&self.store)?;
        Ok(())
    }

    // === Review flow ===

    /// The head review card, or `None` when no reviews remain.
    pub fn review_card(&self) -> Result<Option<(Card, ReviewRow)>, EngineError> {
        let item = match self.reviews.peek() {
            Ok(item) => item,
            Err(EngineError::EmptyBuffer) => return Ok(None),
            Err(e) => return Err(e),
        };
        let card = self.card(item.assignment_id, item.subject_id)?;
        let row = self.store.review_row(item.assignment_id)?;
        Ok(Some((card, row)))
    }

    pub fn answer_review_meaning(&mut self, text: &str) -> Result<Verdict, EngineError> {
        let item = self.reviews.peek()?;
        let meanings = self.store.meanings(item.subject_id)?;
        if matching::meaning_is_correct(text, &meanings, self.strictness) {
            self.reviews
                .pass(&self.store, ReviewTask::Meaning, &now_timestamp())?;
            Ok(Verdict::Accepted)
        } else {
            self.reviews.fail(&self.store, ReviewTask::Meaning)?;
            Ok(Verdict::Rejected)
        }
    }

    pub fn answer_review_reading(&mut self, text: &str) -> Result<Verdict, EngineError> {
        let item = self.reviews.peek()?;
        let readings = self.store.readings(item.subject_id)?;
        if kana::reading_is_correct(text, &readings) {
            self.reviews
                .pass(&self.store, ReviewTask::Reading, &now_timestamp())?;
            Ok(Verdict::Accepted)
        } else {
            self.reviews.fail(&self.store, ReviewTask::Reading)?;
            Ok(Verdict::Rejected)
        }
    }

    // === Lesson flow ===

    /// The head lesson card, or `None` when no lessons remain.
    pub fn lesson_card(&self) -> Result<Option<(Card, LessonItem)>, EngineError> {
        let item = match self.lessons.peek() {
            Ok(item) => item.clone(),
            Err(EngineError::EmptyBuffer) => return Ok(None),
            Err(e) => return Err(e),
        };
        let card = self.card(item.assignment_id, item.subject_id)?;
        Ok(Some((card, item)))
    }

    pub fn see_lesson(&mut self) -> Result<(), EngineError> {
        self.lessons.see()
    }

    pub fn unsee_lesson(&mut self) -> Result<(), EngineError> {
        self.lessons.unsee()
    }

    pub fn answer_lesson_meaning(&mut self, text: &str) -> Result<Verdict, EngineError> {
        let item = self.lessons.peek()?;
        let meanings = self.store.meanings(item.subject_id)?;
        if matching::meaning_is_correct(text, &meanings, self.strictness) {
            self.lessons
                .pass(&self.store, ReviewTask::Meaning, &now_timestamp())?;
            Ok(Verdict::Accepted)
        } else {
            self.lessons.fail(ReviewTask::Meaning)?;
            Ok(Verdict::Rejected)
        }
    }

    pub fn answer_lesson_reading(&mut self, text: &str) -> Result<Verdict, EngineError> {
        let item = self.lessons.peek()?;
        let readings = self.store.readings(item.subject_id)?;
        if kana::reading_is_correct(text, &readings) {
            self.lessons
                .pass(&self.store, ReviewTask::Reading, &now_timestamp())?;
            Ok(Verdict::Accepted)
        } else {
            self.lessons.fail(ReviewTask::Reading)?;
            Ok(Verdict::Rejected)
        }
    }

    // === Progress ===

    /// Completed over total known reviews, 0.0 when none exist yet.
    pub fn progress_fraction(&self) -> Result<f64, EngineError> {
        let total = self.store.count_total_reviews()?;
        if total == 0 {
            return Ok(0.0);
        }
        let completed = self.store.count_completed_reviews()?;
        Ok(completed as f64 / total as f64)
    }

    pub fn available_reviews(&self) -> Result<usize, EngineError> {
        Ok(self.store.count_available_reviews(&now_timestamp())?)
    }

    pub fn available_lessons(&self) -> Result<usize, EngineError> {
        let level = self
            .store
            .get_meta(USER_LEVEL_META)?
            .and_then(|v| v.parse::<i64>().ok());
        Ok(self.store.count_available_lessons(level)?)
    }

    fn card(&self, assignment_id: i64, subject_id: i64) -> Result<Card, EngineError> {
        Ok(Card {
            subject: self.store.subject(subject_id)?,
            assignment: self.store.assignment(assignment_id)?,
            meanings: self.store.meanings(subject_id)?,
            readings: self.store.readings(subject_id)?,
            components: self.store.components(subject_id)?,
            amalgamations: self.store.amalgamations(subject_id)?,
        })
    }

    #[cfg(test)]
    fn peek_review(&self) -> Result<torii_core::types::ReviewItem, EngineError> {
        self.reviews.peek()
    }
}
