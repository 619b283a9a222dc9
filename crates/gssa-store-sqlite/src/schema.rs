//! SQL schema for the GSSA SQLite store.
//!
//! Executed at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS simulations (
    id          INTEGER PRIMARY KEY,
    guid        TEXT    NOT NULL UNIQUE,
    directory   TEXT    NOT NULL,
    exit_code   TEXT    DEFAULT NULL,  -- NULL until the job has finished
    status      TEXT,
    percentage  REAL,
    timestamp   TEXT,                  -- ISO 8601 UTC of the last status update
    validation  TEXT,                  -- JSON object of validation output
    created_at  TEXT    NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    deleted     INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS simulations_status_idx ON simulations(status);

PRAGMA user_version = 1;
";
