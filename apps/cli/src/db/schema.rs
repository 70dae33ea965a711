//! SQLite schema definitions.

/// Complete schema for the local cache.
pub const SCHEMA: &str = r#"
-- Learning items, cached from the remote service
CREATE TABLE IF NOT EXISTS subject (
    id INTEGER PRIMARY KEY,
    characters TEXT,
    level INTEGER NOT NULL,
    object TEXT NOT NULL,
    slug TEXT NOT NULL,
    url TEXT NOT NULL,
    mnemonic_meaning TEXT,
    mnemonic_reading TEXT,
    hidden_at TEXT
);

-- Deduplicated lookup values shared by many subjects
CREATE TABLE IF NOT EXISTS meaning (
    meaning TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS reading (
    reading TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS subject_meaning (
    id INTEGER NOT NULL REFERENCES subject(id),
    meaning TEXT NOT NULL REFERENCES meaning(meaning),
    "primary" INTEGER NOT NULL DEFAULT 0,
    accepted INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (id, meaning)
);

CREATE TABLE IF NOT EXISTS subject_reading (
    id INTEGER NOT NULL REFERENCES subject(id),
    reading TEXT NOT NULL REFERENCES reading(reading),
    "primary" INTEGER NOT NULL DEFAULT 0,
    accepted INTEGER NOT NULL DEFAULT 0,
    type TEXT,
    PRIMARY KEY (id, reading)
);

-- Composition graph edges: radical -> kanji -> vocabulary
CREATE TABLE IF NOT EXISTS components (
    id_component INTEGER NOT NULL,
    id_product INTEGER NOT NULL,
    PRIMARY KEY (id_component, id_product)
);

-- Learner progress, cached from the remote service
CREATE TABLE IF NOT EXISTS assignment (
    assignment_id INTEGER PRIMARY KEY,
    subject_id INTEGER NOT NULL REFERENCES subject(id),
    srs INTEGER NOT NULL,
    hidden INTEGER NOT NULL DEFAULT 0,
    available_at TEXT,
    started_at TEXT,
    unlocked_at TEXT
);

-- Durable quiz state, one row per eligible assignment
CREATE TABLE IF NOT EXISTS review (
    assignment_id INTEGER PRIMARY KEY REFERENCES assignment(assignment_id),
    meaning_passed INTEGER NOT NULL DEFAULT 0,
    reading_passed INTEGER NOT NULL DEFAULT 0,
    incorrect_meaning_answers INTEGER NOT NULL DEFAULT 0,
    incorrect_reading_answers INTEGER NOT NULL DEFAULT 0,
    created_at TEXT
);

-- Completed first-exposure lessons pending report
CREATE TABLE IF NOT EXISTS lesson (
    assignment_id INTEGER PRIMARY KEY REFERENCES assignment(assignment_id),
    started_at TEXT NOT NULL
);

-- Flat key/value metadata: sync cursor, credential, user level
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_assignment_subject ON assignment(subject_id);
CREATE INDEX IF NOT EXISTS idx_assignment_available ON assignment(available_at);
CREATE INDEX IF NOT EXISTS idx_components_product ON components(id_product);
CREATE INDEX IF NOT EXISTS idx_review_created ON review(created_at);
"#;

/// Destructive teardown used by forced regeneration.
pub const DROP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS lesson;
DROP TABLE IF EXISTS review;
DROP TABLE IF EXISTS assignment;
DROP TABLE IF EXISTS components;
DROP TABLE IF EXISTS subject_reading;
DROP TABLE IF EXISTS subject_meaning;
DROP TABLE IF EXISTS reading;
DROP TABLE IF EXISTS meaning;
DROP TABLE IF EXISTS subject;
DROP TABLE IF EXISTS meta;
"#;

/// Tables the schema check expects to find.
pub const EXPECTED_TABLES: &[&str] = &[
    "subject",
    "meaning",
    "reading",
    "subject_meaning",
    "subject_reading",
    "components",
    "assignment",
    "review",
    "lesson",
    "meta",
];
