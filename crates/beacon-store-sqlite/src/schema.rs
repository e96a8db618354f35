//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per StorageKey; values are compact JSON.
CREATE TABLE IF NOT EXISTS preferences (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL      -- ISO 8601 UTC
);

-- The location trail. Appended by the capture service, read by the core,
-- trimmed only by retention pruning.
CREATE TABLE IF NOT EXISTS locations (
    location_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude     REAL NOT NULL,
    longitude    REAL NOT NULL,
    recorded_at  TEXT NOT NULL     -- ISO 8601 UTC
);

CREATE INDEX IF NOT EXISTS locations_recorded_idx ON locations(recorded_at);

PRAGMA user_version = 1;
";
