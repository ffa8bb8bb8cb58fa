//! SQL schema for the readiness SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` marks the
//! schema revision; future migrations will be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS facilities (
    facility_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    code        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sop_requirements (
    requirement_id TEXT PRIMARY KEY,
    code           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    title          TEXT NOT NULL,
    category       TEXT NOT NULL,
    priority       TEXT NOT NULL,    -- 'low' | 'medium' | 'high'
    cadence_days   INTEGER NOT NULL CHECK (cadence_days > 0),
    applies_to_all INTEGER NOT NULL, -- 1: every facility; 0: see requirement_facilities
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requirement_facilities (
    requirement_id TEXT NOT NULL REFERENCES sop_requirements(requirement_id),
    facility_id    TEXT NOT NULL REFERENCES facilities(facility_id),
    PRIMARY KEY (requirement_id, facility_id)
);

-- The review ledger is append-only.
CREATE TABLE IF NOT EXISTS reviews (
    review_id      TEXT PRIMARY KEY,
    facility_id    TEXT NOT NULL REFERENCES facilities(facility_id),
    requirement_id TEXT NOT NULL REFERENCES sop_requirements(requirement_id),
    reviewed_on    TEXT NOT NULL,   -- ISO 8601 calendar date
    reviewer       TEXT NOT NULL,
    recorded_at    TEXT NOT NULL    -- RFC 3339 UTC, microseconds; server-assigned
);

-- Snapshots are append-only; seq preserves insertion order.
CREATE TABLE IF NOT EXISTS snapshots (
    seq                INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_id        TEXT NOT NULL UNIQUE,
    facility_id        TEXT NOT NULL REFERENCES facilities(facility_id),
    snapshot_date      TEXT NOT NULL,
    total_required     INTEGER NOT NULL,
    current_count      INTEGER NOT NULL,
    needs_update_count INTEGER NOT NULL,
    missing_count      INTEGER NOT NULL,
    readiness_pct      INTEGER NOT NULL,
    CHECK (current_count + needs_update_count + missing_count = total_required),
    CHECK (readiness_pct BETWEEN 0 AND 100)
);

CREATE TRIGGER IF NOT EXISTS reviews_no_update BEFORE UPDATE ON reviews
BEGIN SELECT RAISE(ABORT, 'reviews are append-only'); END;
CREATE TRIGGER IF NOT EXISTS reviews_no_delete BEFORE DELETE ON reviews
BEGIN SELECT RAISE(ABORT, 'reviews are append-only'); END;
CREATE TRIGGER IF NOT EXISTS snapshots_no_update BEFORE UPDATE ON snapshots
BEGIN SELECT RAISE(ABORT, 'snapshots are append-only'); END;
CREATE TRIGGER IF NOT EXISTS snapshots_no_delete BEFORE DELETE ON snapshots
BEGIN SELECT RAISE(ABORT, 'snapshots are append-only'); END;

CREATE INDEX IF NOT EXISTS reviews_pair_idx
    ON reviews(facility_id, requirement_id, reviewed_on);
-- One snapshot per facility per instant: the series is strictly increasing.
CREATE UNIQUE INDEX IF NOT EXISTS snapshots_facility_date_idx
    ON snapshots(facility_id, snapshot_date);
CREATE INDEX IF NOT EXISTS requirement_facilities_facility_idx
    ON requirement_facilities(facility_id);

PRAGMA user_version = 2;
";
