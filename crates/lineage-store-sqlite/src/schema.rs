//! SQL schema for the Lineage SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Entity graph ──────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS persons (
    person_id   TEXT PRIMARY KEY,
    xref        TEXT UNIQUE,
    given       TEXT,
    surname     TEXT,
    sex         TEXT,
    birth_date  TEXT,            -- raw, as imported
    birth_place TEXT,
    death_date  TEXT,
    death_place TEXT
);

-- Spouse references are nulled, not cascaded, when a person is deleted.
CREATE TABLE IF NOT EXISTS families (
    family_id      TEXT PRIMARY KEY,
    xref           TEXT UNIQUE,
    husband_id     TEXT REFERENCES persons(person_id) ON DELETE SET NULL,
    wife_id        TEXT REFERENCES persons(person_id) ON DELETE SET NULL,
    marriage_date  TEXT,
    marriage_place TEXT
);

CREATE TABLE IF NOT EXISTS places (
    place_id     TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    authority_id TEXT,
    latitude     REAL,
    longitude    REAL
);

CREATE TABLE IF NOT EXISTS place_variants (
    variant_id TEXT PRIMARY KEY,
    place_id   TEXT NOT NULL REFERENCES places(place_id) ON DELETE CASCADE,
    name       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS events (
    event_id       TEXT PRIMARY KEY,
    event_type     TEXT NOT NULL,
    person_id      TEXT REFERENCES persons(person_id) ON DELETE CASCADE,
    family_id      TEXT REFERENCES families(family_id) ON DELETE CASCADE,
    date_raw       TEXT,
    place_raw      TEXT,
    date_canonical TEXT,         -- ISO 8601 date, derived
    place_id       TEXT REFERENCES places(place_id) ON DELETE SET NULL,
    description    TEXT,
    CHECK (person_id IS NULL OR family_id IS NULL)
);

CREATE TABLE IF NOT EXISTS media_assets (
    asset_id          TEXT PRIMARY KEY,
    path              TEXT NOT NULL,
    sha256            TEXT NOT NULL UNIQUE,
    original_filename TEXT,
    mime_type         TEXT,
    size_bytes        INTEGER
);

CREATE TABLE IF NOT EXISTS media_links (
    link_id     TEXT PRIMARY KEY,
    asset_id    TEXT NOT NULL REFERENCES media_assets(asset_id) ON DELETE CASCADE,
    person_id   TEXT REFERENCES persons(person_id) ON DELETE CASCADE,
    family_id   TEXT REFERENCES families(family_id) ON DELETE CASCADE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS notes (
    note_id   TEXT PRIMARY KEY,
    person_id TEXT REFERENCES persons(person_id) ON DELETE CASCADE,
    family_id TEXT REFERENCES families(family_id) ON DELETE CASCADE,
    text      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationships (
    parent_id TEXT NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    child_id  TEXT NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    rel_type  TEXT NOT NULL DEFAULT 'parent',
    PRIMARY KEY (parent_id, child_id, rel_type)
);

CREATE TABLE IF NOT EXISTS family_children (
    family_id TEXT NOT NULL REFERENCES families(family_id) ON DELETE CASCADE,
    child_id  TEXT NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    PRIMARY KEY (family_id, child_id)
);

CREATE INDEX IF NOT EXISTS events_person_idx   ON events(person_id);
CREATE INDEX IF NOT EXISTS events_family_idx   ON events(family_id);
CREATE INDEX IF NOT EXISTS links_asset_idx     ON media_links(asset_id);
CREATE INDEX IF NOT EXISTS rel_child_idx       ON relationships(child_id);
CREATE INDEX IF NOT EXISTS fam_children_idx    ON family_children(child_id);

-- ── Data quality ──────────────────────────────────────────────────────────

-- Soft reference to any entity; rows survive the entity's deletion.
CREATE TABLE IF NOT EXISTS date_normalizations (
    entity_type  TEXT NOT NULL,
    entity_id    TEXT NOT NULL,
    raw_value    TEXT NOT NULL,
    normalized   TEXT,
    precision    TEXT,
    qualifier    TEXT,
    confidence   REAL NOT NULL,
    is_ambiguous INTEGER NOT NULL,
    PRIMARY KEY (entity_type, entity_id, raw_value)
);

CREATE TABLE IF NOT EXISTS dq_issues (
    issue_id     TEXT PRIMARY KEY,
    issue_type   TEXT NOT NULL,
    severity     TEXT NOT NULL,
    entity_type  TEXT NOT NULL,
    entity_ids   TEXT NOT NULL,  -- JSON array of UUIDs
    status       TEXT NOT NULL DEFAULT 'open',
    confidence   REAL NOT NULL,
    impact_score REAL NOT NULL,
    explanation  TEXT NOT NULL,  -- versioned JSON document
    fingerprint  TEXT NOT NULL,
    detected_at  TEXT NOT NULL,
    resolved_at  TEXT
);

CREATE INDEX IF NOT EXISTS dq_issues_status_idx      ON dq_issues(status, issue_type);
CREATE INDEX IF NOT EXISTS dq_issues_fingerprint_idx ON dq_issues(fingerprint);

-- Append-only except deletion on successful undo.
CREATE TABLE IF NOT EXISTS dq_action_log (
    action_id    TEXT PRIMARY KEY,
    action_type  TEXT NOT NULL,
    payload      TEXT NOT NULL,  -- versioned JSON document
    undo_payload TEXT NOT NULL,  -- versioned JSON document
    created_at   TEXT NOT NULL,
    applied_by   TEXT
);

PRAGMA user_version = 1;
";
