//! Local SQLite cache: subjects, assignments, review/lesson state, metadata.
//!
//! The store is the single owner of the connection; engines borrow it per
//! call. All sync-batch writes go through one transaction so a failed pull
//! never leaves a partial subject graph behind.

use crate::db::error::StoreError;
use crate::db::schema;
use crate::normalize::NormalizedBatch;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use torii_core::types::{
    Assignment, LessonItem, Meaning, Reading, ReviewItem, ReviewRow, ReviewTask, Subject,
    SubjectKind,
};

type Result<T> = std::result::Result<T, StoreError>;

/// A completed review joined with its display form, ready for submission.
#[derive(Debug, Clone)]
pub struct CompletedReview {
    pub assignment_id: i64,
    pub incorrect_meaning_answers: i64,
    pub incorrect_reading_answers: i64,
    pub created_at: String,
    pub characters: Option<String>,
    pub slug: String,
}

/// A completed lesson joined with its display form, ready for submission.
#[derive(Debug, Clone)]
pub struct CompletedLesson {
    pub assignment_id: i64,
    pub started_at: String,
    pub characters: Option<String>,
    pub slug: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the database at `path`, verifying the schema. An empty database
    /// is initialized; a partial schema is reported as corruption.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.enable_foreign_keys()?;
        store.check_schema()?;
        Ok(store)
    }

    /// Open the database at `path`, dropping and recreating the schema.
    /// Destructive repair for a corrupted cache.
    pub fn open_with_regen<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.enable_foreign_keys()?;
        store.regenerate()?;
        Ok(store)
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.enable_foreign_keys()?;
        store.check_schema()?;
        Ok(store)
    }

    fn enable_foreign_keys(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    fn check_schema(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let present: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        let missing: Vec<&str> = schema::EXPECTED_TABLES
            .iter()
            .copied()
            .filter(|t| !present.contains(*t))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        if missing.len() == schema::EXPECTED_TABLES.len() {
            // Fresh database
            self.conn.execute_batch(schema::SCHEMA)?;
            return Ok(());
        }
        Err(StoreError::SchemaCorrupted(missing.join(", ")))
    }

    fn regenerate(&self) -> Result<()> {
        self.conn.execute_batch(schema::DROP_SCHEMA)?;
        self.conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    // === Metadata ===

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // === Sync batch persistence ===

    /// Upsert a normalized pull batch inside one transaction.
    pub fn persist_batch(&mut self, batch: &NormalizedBatch) -> Result<()> {
        let tx = self.conn.transaction()?;

        for s in &batch.subjects {
            tx.execute(
                "INSERT INTO subject
                 (id, characters, level, object, slug, url, mnemonic_meaning, mnemonic_reading, hidden_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                   characters = excluded.characters,
                   level = excluded.level,
                   object = excluded.object,
                   slug = excluded.slug,
                   url = excluded.url,
                   mnemonic_meaning = excluded.mnemonic_meaning,
                   mnemonic_reading = excluded.mnemonic_reading,
                   hidden_at = excluded.hidden_at",
                params![
                    s.id,
                    s.characters,
                    s.level,
                    s.kind.as_str(),
                    s.slug,
                    s.url,
                    s.meaning_mnemonic,
                    s.reading_mnemonic,
                    s.hidden_at,
                ],
            )?;
        }

        for (subject_id, m) in &batch.meanings {
            tx.execute(
                "INSERT OR IGNORE INTO meaning (meaning) VALUES (?1)",
                params![m.text],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO subject_meaning (id, meaning, \"primary\", accepted)
                 VALUES (?1, ?2, ?3, ?4)",
                params![subject_id, m.text, m.primary as i64, m.accepted as i64],
            )?;
        }

        for (subject_id, r) in &batch.readings {
            tx.execute(
                "INSERT OR IGNORE INTO reading (reading) VALUES (?1)",
                params![r.text],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO subject_reading (id, reading, \"primary\", accepted, type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![subject_id, r.text, r.primary as i64, r.accepted as i64, r.kind],
            )?;
        }

        for (component, product) in &batch.components {
            tx.execute(
                "INSERT OR REPLACE INTO components (id_component, id_product) VALUES (?1, ?2)",
                params![component, product],
            )?;
        }

        for a in &batch.assignments {
            tx.execute(
                "INSERT OR REPLACE INTO assignment
                 (assignment_id, subject_id, srs, hidden, available_at, started_at, unlocked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    a.id,
                    a.subject_id,
                    a.srs_stage,
                    a.hidden as i64,
                    a.available_at,
                    a.started_at,
                    a.unlocked_at,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // === Card data ===

    pub fn subject(&self, id: i64) -> Result<Subject> {
        self.conn
            .query_row(
                "SELECT id, characters, level, object, slug, url, mnemonic_meaning, mnemonic_reading, hidden_at
                 FROM subject WHERE id = ?1",
                params![id],
                Self::row_to_subject,
            )
            .optional()?
            .ok_or(StoreError::SubjectNotFound(id))
    }

    pub fn meanings(&self, subject_id: i64) -> Result<Vec<Meaning>> {
        let mut stmt = self.conn.prepare(
            "SELECT meaning, \"primary\", accepted FROM subject_meaning WHERE id = ?1",
        )?;
        let meanings = stmt
            .query_map(params![subject_id], |row| {
                Ok(Meaning {
                    text: row.get(0)?,
                    primary: row.get::<_, i64>(1)? != 0,
                    accepted: row.get::<_, i64>(2)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(meanings)
    }

    pub fn readings(&self, subject_id: i64) -> Result<Vec<Reading>> {
        let mut stmt = self.conn.prepare(
            "SELECT reading, \"primary\", accepted, type FROM subject_reading WHERE id = ?1",
        )?;
        let readings = stmt
            .query_map(params![subject_id], |row| {
                Ok(Reading {
                    text: row.get(0)?,
                    primary: row.get::<_, i64>(1)? != 0,
                    accepted: row.get::<_, i64>(2)? != 0,
                    kind: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(readings)
    }

    /// Subjects that compose the given subject (radicals of a kanji,
    /// kanji of a vocabulary word).
    pub fn components(&self, subject_id: i64) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.characters, s.level, s.object, s.slug, s.url,
                    s.mnemonic_meaning, s.mnemonic_reading, s.hidden_at
             FROM components c
             JOIN subject s ON s.id = c.id_component
             WHERE c.id_product = ?1",
        )?;
        let subjects = stmt
            .query_map(params![subject_id], Self::row_to_subject)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subjects)
    }

    /// Subjects the given subject composes (vocabulary using a kanji).
    pub fn amalgamations(&self, subject_id: i64) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.characters, s.level, s.object, s.slug, s.url,
                    s.mnemonic_meaning, s.mnemonic_reading, s.hidden_at
             FROM components c
             JOIN subject s ON s.id = c.id_product
             WHERE c.id_component = ?1",
        )?;
        let subjects = stmt
            .query_map(params![subject_id], Self::row_to_subject)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subjects)
    }

    pub fn assignment(&self, assignment_id: i64) -> Result<Assignment> {
        self.conn
            .query_row(
                "SELECT assignment_id, subject_id, srs, hidden, available_at, started_at, unlocked_at
                 FROM assignment WHERE assignment_id = ?1",
                params![assignment_id],
                |row| {
                    Ok(Assignment {
                        id: row.get(0)?,
                        subject_id: row.get(1)?,
                        srs_stage: row.get(2)?,
                        hidden: row.get::<_, i64>(3)? != 0,
                        available_at: row.get(4)?,
                        started_at: row.get(5)?,
                        unlocked_at: row.get(6)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::AssignmentNotFound(assignment_id))
    }

    /// Placeholder list for an id exclusion set. SQLite rejects an empty
    /// `IN ()`, so an impossible id stands in when nothing is excluded.
    fn id_placeholders(ids: &[i64]) -> String {
        if ids.is_empty() {
            "-1".to_string()
        } else {
            ids.iter().map(|_| "?").collect::<Vec<_>>().join(",")
        }
    }

    fn row_to_subject(row: &rusqlite::Row) -> rusqlite::Result<Subject> {
        let kind_str: String = row.get(3)?;
        Ok(Subject {
            id: row.get(0)?,
            characters: row.get(1)?,
            level: row.get(2)?,
            kind: SubjectKind::from_str(&kind_str).unwrap_or(SubjectKind::Radical),
            slug: row.get(4)?,
            url: row.get(5)?,
            meaning_mnemonic: row.get(6)?,
            reading_mnemonic: row.get(7)?,
            hidden_at: row.get(8)?,
        })
    }

    // === Review rows ===

    /// Idempotently create a review row for every started assignment whose
    /// availability time has elapsed. Re-running is a no-op for existing rows.
    pub fn populate_reviews(&self, now: &str) -> Result<usize> {
        let count = self.conn.execute(
            "INSERT OR IGNORE INTO review (assignment_id)
             SELECT assignment_id FROM assignment
             WHERE started_at IS NOT NULL
               AND available_at IS NOT NULL
               AND available_at <= ?1",
            params![now],
        )?;
        Ok(count)
    }

    /// Pass the reading task for every review row whose subject carries no
    /// reading task. Applies retroactively to rows from earlier syncs.
    pub fn auto_pass_readings(&self) -> Result<usize> {
        let count = self.conn.execute(
            "UPDATE review SET reading_passed = 1
             WHERE reading_passed = 0
               AND assignment_id IN (
                 SELECT a.assignment_id
                 FROM assignment a
                 JOIN subject s ON s.id = a.subject_id
                 WHERE s.object IN ('radical', 'kana_vocabulary'))",
            [],
        )?;
        Ok(count)
    }

    pub fn review_row(&self, assignment_id: i64) -> Result<ReviewRow> {
        self.conn
            .query_row(
                "SELECT assignment_id, meaning_passed, reading_passed,
                        incorrect_meaning_answers, incorrect_reading_answers, created_at
                 FROM review WHERE assignment_id = ?1",
                params![assignment_id],
                |row| {
                    Ok(ReviewRow {
                        assignment_id: row.get(0)?,
                        meaning_passed: row.get::<_, i64>(1)? != 0,
                        reading_passed: row.get::<_, i64>(2)? != 0,
                        incorrect_meaning_answers: row.get(3)?,
                        incorrect_reading_answers: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::AssignmentNotFound(assignment_id))
    }

    pub fn set_task_passed(&self, assignment_id: i64, task: ReviewTask) -> Result<()> {
        let sql = match task {
            ReviewTask::Meaning => "UPDATE review SET meaning_passed = 1 WHERE assignment_id = ?1",
            ReviewTask::Reading => "UPDATE review SET reading_passed = 1 WHERE assignment_id = ?1",
        };
        self.conn.execute(sql, params![assignment_id])?;
        Ok(())
    }

    /// Eagerly bump the durable failure counter so a crash mid-session
    /// never loses the count of mistakes made.
    pub fn increment_incorrect(&self, assignment_id: i64, task: ReviewTask) -> Result<()> {
        let sql = match task {
            ReviewTask::Meaning => {
                "UPDATE review SET incorrect_meaning_answers = incorrect_meaning_answers + 1
                 WHERE assignment_id = ?1"
            }
            ReviewTask::Reading => {
                "UPDATE review SET incorrect_reading_answers = incorrect_reading_answers + 1
                 WHERE assignment_id = ?1"
            }
        };
        self.conn.execute(sql, params![assignment_id])?;
        Ok(())
    }

    /// Stamp a review complete. The guard keeps `created_at` monotonic: a
    /// second call can never overwrite the first timestamp.
    pub fn mark_review_complete(&self, assignment_id: i64, timestamp: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE review SET created_at = ?1 WHERE assignment_id = ?2 AND created_at IS NULL",
            params![timestamp, assignment_id],
        )?;
        Ok(())
    }

    /// Random selection of not-yet-completed review items, excluding
    /// anything already in the working set.
    pub fn incomplete_review_items(&self, exclude: &[i64], limit: usize) -> Result<Vec<ReviewItem>> {
        let placeholders = Self::id_placeholders(exclude);
        let sql = format!(
            "SELECT r.assignment_id, a.subject_id
             FROM review r
             JOIN assignment a ON a.assignment_id = r.assignment_id
             WHERE NOT (r.meaning_passed = 1 AND r.reading_passed = 1)
               AND r.created_at IS NULL
               AND r.assignment_id NOT IN ({placeholders})
             ORDER BY RANDOM()
             LIMIT ?"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut params_vec: Vec<&dyn rusqlite::ToSql> =
            exclude.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        let limit = limit as i64;
        params_vec.push(&limit);

        let items = stmt
            .query_map(params_vec.as_slice(), |row| {
                Ok(ReviewItem {
                    assignment_id: row.get(0)?,
                    subject_id: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn completed_reviews(&self) -> Result<Vec<CompletedReview>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.assignment_id, r.incorrect_meaning_answers, r.incorrect_reading_answers,
                    r.created_at, s.characters, s.slug
             FROM review r
             JOIN assignment a ON a.assignment_id = r.assignment_id
             JOIN subject s ON s.id = a.subject_id
             WHERE r.created_at IS NOT NULL",
        )?;
        let reviews = stmt
            .query_map([], |row| {
                Ok(CompletedReview {
                    assignment_id: row.get(0)?,
                    incorrect_meaning_answers: row.get(1)?,
                    incorrect_reading_answers: row.get(2)?,
                    created_at: row.get(3)?,
                    characters: row.get(4)?,
                    slug: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    pub fn count_total_reviews(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM review", [], |row| row.get(0))
            .map_err(Into::into)
    }

    pub fn count_completed_reviews(&self) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM review WHERE created_at IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn count_available_reviews(&self, now: &str) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*)
                 FROM assignment a
                 JOIN subject s ON s.id = a.subject_id
                 WHERE a.started_at IS NOT NULL
                   AND a.available_at IS NOT NULL
                   AND a.available_at <= ?1
                   AND a.hidden = 0
                   AND s.hidden_at IS NULL",
                params![now],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // === Lessons ===

    /// Random selection of unstarted, unlocked assignments at or below the
    /// learner's level, not yet recorded as started, excluding anything
    /// already buffered. Reading is pre-passed for kinds with no reading
    /// task.
    pub fn unstarted_lesson_items(
        &self,
        level: Option<i64>,
        exclude: &[i64],
        limit: usize,
    ) -> Result<Vec<LessonItem>> {
        let placeholders = Self::id_placeholders(exclude);
        let sql = format!(
            "SELECT a.assignment_id, s.id,
                    CASE WHEN s.object IN ('radical', 'kana_vocabulary') THEN 1 ELSE 0 END
             FROM assignment a
             JOIN subject s ON a.subject_id = s.id
             WHERE a.started_at IS NULL
               AND a.hidden = 0
               AND s.hidden_at IS NULL
               AND a.unlocked_at IS NOT NULL
               AND a.assignment_id NOT IN (SELECT assignment_id FROM lesson)
               AND (? IS NULL OR s.level <= ?)
               AND a.assignment_id NOT IN ({placeholders})
             ORDER BY RANDOM()
             LIMIT ?"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let limit = limit as i64;
        let mut params_vec: Vec<&dyn rusqlite::ToSql> = vec![&level, &level];
        params_vec.extend(exclude.iter().map(|id| id as &dyn rusqlite::ToSql));
        params_vec.push(&limit);

        let items = stmt
            .query_map(params_vec.as_slice(), |row| {
                Ok(LessonItem {
                    assignment_id: row.get(0)?,
                    subject_id: row.get(1)?,
                    meaning_passed: false,
                    reading_passed: row.get::<_, i64>(2)? != 0,
                    seen: false,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn insert_lesson(&self, assignment_id: i64, started_at: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO lesson (assignment_id, started_at) VALUES (?1, ?2)",
            params![assignment_id, started_at],
        )?;
        Ok(())
    }

    pub fn completed_lessons(&self) -> Result<Vec<CompletedLesson>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.assignment_id, l.started_at, s.characters, s.slug
             FROM lesson l
             JOIN assignment a ON a.assignment_id = l.assignment_id
             JOIN subject s ON s.id = a.subject_id",
        )?;
        let lessons = stmt
            .query_map([], |row| {
                Ok(CompletedLesson {
                    assignment_id: row.get(0)?,
                    started_at: row.get(1)?,
                    characters: row.get(2)?,
                    slug: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lessons)
    }

    pub fn count_available_lessons(&self, level: Option<i64>) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*)
                 FROM assignment a
                 JOIN subject s ON a.subject_id = s.id
                 WHERE a.started_at IS NULL
                   AND a.hidden = 0
                   AND s.hidden_at IS NULL
                   AND a.unlocked_at IS NOT NULL
                   AND a.assignment_id NOT IN (SELECT assignment_id FROM lesson)
                   AND (?1 IS NULL OR s.level <= ?1)",
                params![level],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
