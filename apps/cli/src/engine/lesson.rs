//! Lesson working set: first exposure of not-yet-started assignments.
//!
//! Same buffer shape as reviews, with two differences: pass state is
//! session-local (no durable counters, wrong answers just rotate), and
//! answering is gated behind an explicit `see` acknowledgement that can be
//! stepped back exactly once.

use crate::db::Store;
use crate::engine::EngineError;
use std::collections::VecDeque;
use torii_core::types::{LessonItem, ReviewTask};

pub struct LessonEngine {
    buffer: VecDeque<LessonItem>,
    capacity: usize,
    /// Level gate for surfacing new content. `None` surfaces everything
    /// unlocked (no user level known yet).
    level: Option<i64>,
}

impl LessonEngine {
    pub fn new(capacity: usize, level: Option<i64>) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            level,
        }
    }

    pub fn set_level(&mut self, level: Option<i64>) {
        self.level = level;
    }

    /// Fill the buffer with unstarted, unlocked assignments at or below
    /// the learner's level, excluding anything already buffered.
    pub fn refresh(&mut self, store: &Store) -> Result<(), EngineError> {
        if self.buffer.len() >= self.capacity {
            return Ok(());
        }
        let exclude: Vec<i64> = self.buffer.iter().map(|i| i.assignment_id).collect();
        let wanted = self.capacity - self.buffer.len();
        for item in store.unstarted_lesson_items(self.level, &exclude, wanted)? {
            self.buffer.push_back(item);
        }
        Ok(())
    }

    pub fn peek(&self) -> Result<&LessonItem, EngineError> {
        self.buffer.front().ok_or(EngineError::EmptyBuffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Acknowledge the head item as seen, unlocking its answer tasks.
    pub fn see(&mut self) -> Result<(), EngineError> {
        let head = self.head_mut()?;
        if head.seen {
            return Err(EngineError::AlreadySeen);
        }
        head.seen = true;
        Ok(())
    }

    /// Step the acknowledgement back. Only one step is possible: the seen
    /// flag is two-valued, so a second step back has nowhere to go.
    pub fn unsee(&mut self) -> Result<(), EngineError> {
        let head = self.head_mut()?;
        if !head.seen {
            return Err(EngineError::NotYetSeen);
        }
        head.seen = false;
        Ok(())
    }

    /// Record a correct answer for the head item's given task. Both tasks
    /// passed completes the lesson: a lesson row is written and the slot
    /// refilled.
    pub fn pass(&mut self, store: &Store, task: ReviewTask, now: &str) -> Result<(), EngineError> {
        let head = self.head_mut()?;
        if !head.seen {
            return Err(EngineError::NotYetSeen);
        }
        let passed = match task {
            ReviewTask::Meaning => &mut head.meaning_passed,
            ReviewTask::Reading => &mut head.reading_passed,
        };
        if *passed {
            return Err(EngineError::AlreadyPassed(head.assignment_id));
        }
        *passed = true;

        if head.meaning_passed && head.reading_passed {
            let assignment_id = head.assignment_id;
            store.insert_lesson(assignment_id, now)?;
            self.buffer.pop_front();
            self.refresh(store)?;
        } else {
            self.rotate();
        }
        Ok(())
    }

    /// Wrong lesson answers rotate without any penalty tracking.
    pub fn fail(&mut self, task: ReviewTask) -> Result<(), EngineError> {
        let head = self.head_mut()?;
        if !head.seen {
            return Err(EngineError::NotYetSeen);
        }
        let passed = match task {
            ReviewTask::Meaning => head.meaning_passed,
            ReviewTask::Reading => head.reading_passed,
        };
        if passed {
            return Err(EngineError::AlreadyPassed(head.assignment_id));
        }
        self.rotate();
        Ok(())
    }

    fn head_mut(&mut self) -> Result<&mut LessonItem, EngineError> {
        self.buffer.front_mut().ok_or(EngineError::EmptyBuffer)
    }

    fn rotate(&mut self) {
        if let Some(item) = self.buffer.pop_front() {
            self.buffer.push_back(item);
        }
    }
}
