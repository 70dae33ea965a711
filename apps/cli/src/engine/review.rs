//! Review working set and the per-item dual-task state machine.
//!
//! An assignment moves Queued -> Active -> Complete. Failing a task never
//! moves it backward: the durable counter is bumped and the item rotates
//! to the tail, spacing repetition within the session.

use crate::db::Store;
use crate::engine::EngineError;
use std::collections::VecDeque;
use torii_core::types::{ReviewItem, ReviewTask};

pub struct ReviewEngine {
    buffer: VecDeque<ReviewItem>,
    capacity: usize,
}

impl ReviewEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Bring the durable review table up to date and fill the buffer.
    ///
    /// Population is idempotent, auto-pass applies retroactively, and the
    /// fill excludes anything already buffered.
    pub fn refresh(&mut self, store: &Store, now: &str) -> Result<(), EngineError> {
        let created = store.populate_reviews(now)?;
        let auto_passed = store.auto_pass_readings()?;
        if created > 0 || auto_passed > 0 {
            tracing::debug!(created, auto_passed, "review table refreshed");
        }
        self.fill(store)
    }

    fn fill(&mut self, store: &Store) -> Result<(), EngineError> {
        if self.buffer.len() >= self.capacity {
            return Ok(());
        }
        let exclude: Vec<i64> = self.buffer.iter().map(|i| i.assignment_id).collect();
        let wanted = self.capacity - self.buffer.len();
        for item in store.incomplete_review_items(&exclude, wanted)? {
            self.buffer.push_back(item);
        }
        Ok(())
    }

    /// Head of the buffer. `EmptyBuffer` means no reviews remain.
    pub fn peek(&self) -> Result<ReviewItem, EngineError> {
        self.buffer.front().copied().ok_or(EngineError::EmptyBuffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Record a correct answer for the head item's given task.
    ///
    /// When the other task is already passed the review completes:
    /// `created_at` is stamped, the item leaves the buffer, and one slot is
    /// refilled. Otherwise the item rotates to the tail.
    pub fn pass(&mut self, store: &Store, task: ReviewTask, now: &str) -> Result<(), EngineError> {
        let item = self.peek()?;
        let row = store.review_row(item.assignment_id)?;
        if row.task_passed(task) {
            return Err(EngineError::AlreadyPassed(item.assignment_id));
        }

        store.set_task_passed(item.assignment_id, task)?;
        let row = store.review_row(item.assignment_id)?;
        if row.meaning_passed && row.reading_passed {
            store.mark_review_complete(item.assignment_id, now)?;
            self.buffer.pop_front();
            self.fill(store)?;
        } else {
            self.rotate();
        }
        Ok(())
    }

    /// Record a wrong answer: bump the durable counter, rotate the item.
    pub fn fail(&mut self, store: &Store, task: ReviewTask) -> Result<(), EngineError> {
        let item = self.peek()?;
        let row = store.review_row(item.assignment_id)?;
        if row.task_passed(task) {
            return Err(EngineError::AlreadyPassed(item.assignment_id));
        }
        store.increment_incorrect(item.assignment_id, task)?;
        self.rotate();
        Ok(())
    }

    fn rotate(&mut self) {
        if let Some(item) = self.buffer.pop_front() {
            self.buffer.push_back(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizedBatch;
    use pretty_assertions::assert_eq;
    use torii_core::types::{Assignment, Meaning, Subject, SubjectKind};

    const NOW: &str = "2026-02-01T00:00:00Z";

    fn due_batch(specs: &[(i64, SubjectKind)]) -> NormalizedBatch {
        let subjects: Vec<Subject> = specs
            .iter()
            .map(|(id, kind)| Subject {
                id: *id,
                kind: *kind,
                characters: Some(format!("字{id}")),
                slug: format!("subject-{id}"),
                level: 1,
                url: format!("https://example.com/subjects/{id}"),
                meaning_mnemonic: Some("mnemonic".to_string()),
                reading_mnemonic: None,
                hidden_at: None,
            })
            .collect();
        let meanings = specs
            .iter()
            .map(|(id, _)| {
                (
                    *id,
                    Meaning {
                        text: "Person".to_string(),
                        primary: true,
                        accepted: true,
                    },
                )
            })
            .collect();
        let assignments = specs
            .iter()
            .map(|(id, _)| Assignment {
                id: id * 10,
                subject_id: *id,
                srs_stage: 1,
                hidden: false,
                available_at: Some("2026-01-01T00:00:00Z".to_string()),
                started_at: Some("2025-12-01T00:00:00Z".to_string()),
                unlocked_at: Some("2025-11-01T00:00:00Z".to_string()),
            })
            .collect();
        NormalizedBatch {
            subjects,
            meanings,
            readings: vec![],
            components: vec![],
            assignments,
        }
    }

    fn store_with(specs: &[(i64, SubjectKind)]) -> Store {
        let mut store = Store::open_in_memory().unwrap();
        store.persist_batch(&due_batch(specs)).unwrap();
        store
    }

    #[test]
    fn empty_store_yields_empty_buffer() {
        let store = Store::open_in_memory().unwrap();
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();
        assert!(matches!(engine.peek(), Err(EngineError::EmptyBuffer)));
    }

    #[test]
    fn refresh_fills_to_capacity_at_most() {
        let specs: Vec<_> = (1..=8).map(|id| (id, SubjectKind::Kanji)).collect();
        let store = store_with(&specs);
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();
        assert_eq!(engine.len(), 5);

        // Refresh again: the fill excludes buffered items, so nothing is
        // duplicated and the buffer stays at capacity.
        engine.refresh(&store, NOW).unwrap();
        assert_eq!(engine.len(), 5);
    }

    #[test]
    fn kanji_needs_both_tasks_to_complete() {
        let store = store_with(&[(1, SubjectKind::Kanji)]);
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();

        engine.pass(&store, ReviewTask::Meaning, NOW).unwrap();
        assert_eq!(engine.len(), 1);
        assert!(store.review_row(10).unwrap().created_at.is_none());

        engine.pass(&store, ReviewTask::Reading, NOW).unwrap();
        assert!(engine.is_empty());
        let row = store.review_row(10).unwrap();
        assert!(row.meaning_passed && row.reading_passed);
        assert_eq!(row.created_at.as_deref(), Some(NOW));
    }

    #[test]
    fn radical_completes_on_meaning_alone() {
        let store = store_with(&[(1, SubjectKind::Radical)]);
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();

        // Auto-pass already resolved the reading task.
        assert!(store.review_row(10).unwrap().reading_passed);

        engine.pass(&store, ReviewTask::Meaning, NOW).unwrap();
        assert!(engine.is_empty());
        assert!(store.review_row(10).unwrap().created_at.is_some());
    }

    #[test]
    fn failure_rotates_and_counts() {
        let store = store_with(&[(1, SubjectKind::Kanji), (2, SubjectKind::Kanji)]);
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();

        let head = engine.peek().unwrap();
        engine.fail(&store, ReviewTask::Meaning).unwrap();
        assert_ne!(engine.peek().unwrap().assignment_id, head.assignment_id);
        assert_eq!(engine.len(), 2);

        let row = store.review_row(head.assignment_id).unwrap();
        assert_eq!(row.incorrect_meaning_answers, 1);
        assert!(!row.meaning_passed);
    }

    #[test]
    fn passing_one_task_rotates_the_item() {
        let store = store_with(&[(1, SubjectKind::Kanji), (2, SubjectKind::Kanji)]);
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();

        let head = engine.peek().unwrap();
        engine.pass(&store, ReviewTask::Meaning, NOW).unwrap();
        assert_ne!(engine.peek().unwrap().assignment_id, head.assignment_id);
    }

    #[test]
    fn passing_a_resolved_task_is_a_precondition_violation() {
        let store = store_with(&[(1, SubjectKind::Radical)]);
        let mut engine = ReviewEngine::new(5);
        engine.refresh(&store, NOW).unwrap();

        assert!(matches!(
            engine.pass(&store, ReviewTask::Reading, NOW),
            Err(EngineError::AlreadyPassed(10))
        ));
        assert!(matches!(
            engine.fail(&store, ReviewTask::Reading),
            Err(EngineError::AlreadyPassed(10))
        ));
    }

    #[test]
    fn completion_refills_from_the_queue() {
        let specs: Vec<_> = (1..=3).map(|id| (id, SubjectKind::Radical)).collect();
        let store = store_with(&specs);
        let mut engine = ReviewEngine::new(2);
        engine.refresh(&store, NOW).unwrap();
        assert_eq!(engine.len(), 2);

        // Completing one pulls the queued third item in.
        engine.pass(&store, ReviewTask::Meaning, NOW).unwrap();
        assert_eq!(engine.len(), 2);

        engine.pass(&store, ReviewTask::Meaning, NOW).unwrap();
        assert_eq!(engine.len(), 1);
        engine.pass(&store, ReviewTask::Meaning, NOW).unwrap();
        assert!(engine.is_empty());
        assert_eq!(store.count_completed_reviews().unwrap(), 3);
    }
}
