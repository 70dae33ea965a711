//! Session engines: the rotating working-set buffers for reviews and
//! lessons.
//!
//! Engines hold only the in-memory buffer; all durable state lives in the
//! store, which they borrow per call. Neither engine is thread-safe and
//! neither is meant to be shared.

pub mod lesson;
pub mod review;

pub use lesson::LessonEngine;
pub use review::ReviewEngine;

use crate::db::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Normal terminal condition: nothing left to quiz.
    #[error("working set is empty")]
    EmptyBuffer,

    /// Precondition violation: the task was already resolved for the head
    /// item. The public flow never offers a resolved task.
    #[error("task already passed for assignment {0}")]
    AlreadyPassed(i64),

    /// Lesson head was acknowledged twice.
    #[error("head item has already been seen")]
    AlreadySeen,

    /// Lesson answer or backward step before the head was acknowledged.
    #[error("head item has not been seen yet")]
    NotYetSeen,

    #[error(transparent)]
    Store(#[from] StoreError),
}
