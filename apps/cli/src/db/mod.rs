//! Local SQLite cache operations.

pub mod error;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use store::{CompletedLesson, CompletedReview, Store};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizedBatch;
    use torii_core::types::{Assignment, Meaning, Reading, ReviewTask, Subject, SubjectKind};

    fn subject(id: i64, kind: SubjectKind, level: i64) -> Subject {
        Subject {
            id,
            kind,
            characters: Some(format!("字{id}")),
            slug: format!("subject-{id}"),
            level,
            url: format!("https://example.com/subjects/{id}"),
            meaning_mnemonic: Some("mnemonic".to_string()),
            reading_mnemonic: kind.has_reading_task().then(|| "mnemonic".to_string()),
            hidden_at: None,
        }
    }

    fn assignment(id: i64, subject_id: i64, started: bool, available: Option<&str>) -> Assignment {
        Assignment {
            id,
            subject_id,
            srs_stage: 1,
            hidden: false,
            available_at: available.map(String::from),
            started_at: started.then(|| "2026-01-01T00:00:00Z".to_string()),
            unlocked_at: Some("2025-12-01T00:00:00Z".to_string()),
        }
    }

    fn batch_with(subjects: Vec<Subject>, assignments: Vec<Assignment>) -> NormalizedBatch {
        let meanings = subjects
            .iter()
            .map(|s| {
                (
                    s.id,
                    Meaning {
                        text: format!("Meaning {}", s.id),
                        primary: true,
                        accepted: true,
                    },
                )
            })
            .collect();
        let readings = subjects
            .iter()
            .filter(|s| s.kind.has_reading_task())
            .map(|s| {
                (
                    s.id,
                    Reading {
                        text: "じん".to_string(),
                        primary: true,
                        accepted: true,
                        kind: Some("onyomi".to_string()),
                    },
                )
            })
            .collect();
        NormalizedBatch {
            subjects,
            meanings,
            readings,
            components: vec![],
            assignments,
        }
    }

    fn seeded_store() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let batch = batch_with(
            vec![
                subject(1, SubjectKind::Kanji, 1),
                subject(2, SubjectKind::Radical, 1),
            ],
            vec![
                assignment(10, 1, true, Some("2026-01-02T00:00:00Z")),
                assignment(20, 2, true, Some("2026-01-02T00:00:00Z")),
            ],
        );
        store.persist_batch(&batch).unwrap();
        store
    }

    const NOW: &str = "2026-02-01T00:00:00Z";

    #[test]
    fn persist_batch_upserts_and_dedups() {
        let mut store = seeded_store();

        // Same batch twice: no duplicates, updated fields win.
        let mut batch = batch_with(vec![subject(1, SubjectKind::Kanji, 1)], vec![]);
        batch.subjects[0].slug = "renamed".to_string();
        store.persist_batch(&batch).unwrap();

        let s = store.subject(1).unwrap();
        assert_eq!(s.slug, "renamed");
        assert_eq!(store.meanings(1).unwrap().len(), 1);
    }

    #[test]
    fn failed_batch_rolls_back_entirely() {
        let mut store = Store::open_in_memory().unwrap();

        // The assignment references a subject missing from the batch; the
        // foreign key failure must undo the subject insert too.
        let batch = batch_with(
            vec![subject(1, SubjectKind::Kanji, 1)],
            vec![assignment(10, 999, true, None)],
        );
        assert!(store.persist_batch(&batch).is_err());

        assert!(matches!(
            store.subject(1),
            Err(StoreError::SubjectNotFound(1))
        ));
        assert!(store.meanings(1).unwrap().is_empty());
    }

    #[test]
    fn populate_reviews_is_idempotent() {
        let store = seeded_store();
        assert_eq!(store.populate_reviews(NOW).unwrap(), 2);
        assert_eq!(store.populate_reviews(NOW).unwrap(), 0);
        assert_eq!(store.count_total_reviews().unwrap(), 2);
    }

    #[test]
    fn populate_skips_unstarted_and_future_assignments() {
        let mut store = seeded_store();
        let batch = batch_with(
            vec![
                subject(3, SubjectKind::Vocabulary, 1),
                subject(4, SubjectKind::Vocabulary, 1),
            ],
            vec![
                assignment(30, 3, false, Some("2026-01-02T00:00:00Z")),
                assignment(40, 4, true, Some("2099-01-01T00:00:00Z")),
            ],
        );
        store.persist_batch(&batch).unwrap();

        assert_eq!(store.populate_reviews(NOW).unwrap(), 2);
        assert!(store.review_row(30).is_err());
        assert!(store.review_row(40).is_err());
    }

    #[test]
    fn auto_pass_applies_retroactively() {
        let store = seeded_store();
        store.populate_reviews(NOW).unwrap();
        assert_eq!(store.auto_pass_readings().unwrap(), 1);

        // Radical reading is passed, kanji reading is not.
        assert!(store.review_row(20).unwrap().reading_passed);
        assert!(!store.review_row(10).unwrap().reading_passed);

        // Second run finds nothing left to pass.
        assert_eq!(store.auto_pass_readings().unwrap(), 0);
    }

    #[test]
    fn completion_is_monotonic() {
        let store = seeded_store();
        store.populate_reviews(NOW).unwrap();
        store.mark_review_complete(10, "2026-02-01T10:00:00Z").unwrap();
        store.mark_review_complete(10, "2026-02-02T10:00:00Z").unwrap();

        let row = store.review_row(10).unwrap();
        assert_eq!(row.created_at.as_deref(), Some("2026-02-01T10:00:00Z"));
    }

    #[test]
    fn failure_counters_accumulate() {
        let store = seeded_store();
        store.populate_reviews(NOW).unwrap();
        store.increment_incorrect(10, ReviewTask::Meaning).unwrap();
        store.increment_incorrect(10, ReviewTask::Meaning).unwrap();
        store.increment_incorrect(10, ReviewTask::Reading).unwrap();

        let row = store.review_row(10).unwrap();
        assert_eq!(row.incorrect_meaning_answers, 2);
        assert_eq!(row.incorrect_reading_answers, 1);
    }

    #[test]
    fn incomplete_selection_excludes_buffered_and_completed() {
        let store = seeded_store();
        store.populate_reviews(NOW).unwrap();
        store.mark_review_complete(20, NOW).unwrap();

        let items = store.incomplete_review_items(&[], 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].assignment_id, 10);

        let items = store.incomplete_review_items(&[10], 10).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn lesson_selection_respects_level_and_lesson_table() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = batch_with(
            vec![
                subject(1, SubjectKind::Kanji, 1),
                subject(2, SubjectKind::Kanji, 9),
            ],
            vec![assignment(10, 1, false, None), assignment(20, 2, false, None)],
        );
        store.persist_batch(&batch).unwrap();

        let items = store.unstarted_lesson_items(Some(3), &[], 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].assignment_id, 10);

        // No known level: everything unlocked surfaces.
        assert_eq!(store.unstarted_lesson_items(None, &[], 10).unwrap().len(), 2);

        store.insert_lesson(10, NOW).unwrap();
        assert!(store.unstarted_lesson_items(Some(3), &[], 10).unwrap().is_empty());
    }

    #[test]
    fn lesson_items_seed_auto_passed_reading() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = batch_with(
            vec![
                subject(1, SubjectKind::Radical, 1),
                subject(2, SubjectKind::Kanji, 1),
            ],
            vec![assignment(10, 1, false, None), assignment(20, 2, false, None)],
        );
        store.persist_batch(&batch).unwrap();

        let items = store.unstarted_lesson_items(None, &[], 10).unwrap();
        for item in items {
            let expected = item.assignment_id == 10;
            assert_eq!(item.reading_passed, expected);
            assert!(!item.seen);
            assert!(!item.meaning_passed);
        }
    }

    #[test]
    fn meta_round_trips() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_meta("updated_after").unwrap(), None);
        store.set_meta("updated_after", "2026-01-01T00:00:00Z").unwrap();
        store.set_meta("updated_after", "2026-02-01T00:00:00Z").unwrap();
        assert_eq!(
            store.get_meta("updated_after").unwrap().as_deref(),
            Some("2026-02-01T00:00:00Z")
        );
    }

    #[test]
    fn partial_schema_is_reported_as_corruption() {
        let dir = std::env::temp_dir().join(format!("torii-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.sqlite3");
        let _ = std::fs::remove_file(&path);

        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE subject (id INTEGER PRIMARY KEY);")
                .unwrap();
        }

        match Store::open(&path) {
            Err(StoreError::SchemaCorrupted(_)) => {}
            Err(e) => panic!("expected SchemaCorrupted, got {e:?}"),
            Ok(_) => panic!("expected SchemaCorrupted, got a working store"),
        }

        // Destructive repair brings the schema back.
        let store = Store::open_with_regen(&path).unwrap();
        assert_eq!(store.count_total_reviews().unwrap(), 0);
        let _ = std::fs::remove_file(&path);
    }
}
