//! Sync orchestration: incremental pull from the remote service and push
//! of locally completed work.
//!
//! Pull is ordered so a crash can only lose freshness, never correctness:
//! the cursor advances only after the batch is persisted. Push is
//! at-least-once; the remote deduplicates, and the next full pull
//! reconciles local state.

use crate::api::types::{ReviewPayload, ReviewSubmission, StartAssignmentPayload};
use crate::api::{ApiClient, ApiError};
use crate::db::StoreError;
use crate::engine::EngineError;
use crate::normalize::{self, NormalizeError};
use crate::session::{Session, USER_LEVEL_META};
use chrono::{SecondsFormat, Utc};
use thiserror::Error;

/// Metadata key holding the incremental pull cursor.
pub const CURSOR_META: &str = "updated_after";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What a sync cycle did. `Offline` is a reported state, not an error:
/// the operation is abandoned for this cycle and retried on the next
/// explicit sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Pulled {
        subjects: usize,
        assignments: usize,
    },
    Pushed {
        reviews: usize,
        lessons: usize,
    },
    Offline,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Incremental pull: fetch everything changed since the cursor, persist it
/// in one transaction, then advance the cursor and refresh the session.
pub async fn pull(session: &mut Session, client: &ApiClient) -> Result<SyncOutcome, SyncError> {
    let cursor = session.store().get_meta(CURSOR_META)?;
    let started = now_timestamp();
    tracing::info!(cursor = cursor.as_deref(), "pull starting");

    let fetched = async {
        let subjects = client.fetch_paged("subjects", cursor.as_deref()).await?;
        let assignments = client.fetch_paged("assignments", cursor.as_deref()).await?;
        let user = client.fetch_user().await?;
        Ok::<_, ApiError>((subjects, assignments, user))
    }
    .await;

    let (subjects, assignments, user) = match fetched {
        Ok(parts) => parts,
        Err(e) if e.is_offline() => {
            tracing::warn!(error = %e, "remote unreachable, pull abandoned");
            return Ok(SyncOutcome::Offline);
        }
        Err(e) => return Err(e.into()),
    };

    let batch = normalize::batch(&subjects, &assignments)?;
    session.store_mut().persist_batch(&batch)?;
    session
        .store()
        .set_meta(USER_LEVEL_META, &user.data.level.to_string())?;

    // Cursor moves to the pull's start time, not its end, so items that
    // changed mid-pull are picked up again next time.
    session.store().set_meta(CURSOR_META, &started)?;

    session.refresh()?;
    tracing::info!(
        subjects = subjects.len(),
        assignments = assignments.len(),
        level = user.data.level,
        "pull complete"
    );
    Ok(SyncOutcome::Pulled {
        subjects: subjects.len(),
        assignments: assignments.len(),
    })
}

/// Report completed reviews and lessons upstream. No local mutation on
/// success; the next pull filters reported rows out.
pub async fn push(session: &Session, client: &ApiClient) -> Result<SyncOutcome, SyncError> {
    let reviews = session.store().completed_reviews()?;
    let lessons = session.store().completed_lessons()?;
    tracing::info!(
        reviews = reviews.len(),
        lessons = lessons.len(),
        "push starting"
    );

    for review in &reviews {
        let submission = ReviewSubmission {
            review: ReviewPayload {
                assignment_id: review.assignment_id,
                incorrect_meaning_answers: review.incorrect_meaning_answers,
                incorrect_reading_answers: review.incorrect_reading_answers,
                created_at: review.created_at.clone(),
            },
        };
        match client.submit_review(&submission).await {
            Ok(_) => {
                tracing::debug!(
                    assignment_id = review.assignment_id,
                    slug = %review.slug,
                    "review reported"
                );
            }
            Err(e) if e.is_offline() => {
                tracing::warn!(error = %e, "remote unreachable, push abandoned");
                return Ok(SyncOutcome::Offline);
            }
            Err(e) => return Err(e.into()),
        }
    }

    for lesson in &lessons {
        let payload = StartAssignmentPayload {
            started_at: lesson.started_at.clone(),
        };
        match client.start_assignment(lesson.assignment_id, &payload).await {
            Ok(_) => {
                tracing::debug!(
                    assignment_id = lesson.assignment_id,
                    slug = %lesson.slug,
                    "lesson reported"
                );
            }
            Err(e) if e.is_offline() => {
                tracing::warn!(error = %e, "remote unreachable, push abandoned");
                return Ok(SyncOutcome::Offline);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(SyncOutcome::Pushed {
        reviews: reviews.len(),
        lessons: lessons.len(),
    })
}
