//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, exit codes as their text form
//! and directories as UTF-8 paths.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gssa_core::record::{ExitCode, SimulationRecord};

use crate::{Error, Result};

/// Column list shared by every query that builds a [`RawRecord`].
pub const RECORD_COLUMNS: &str = "id, guid, directory, exit_code, status, percentage, \
                                  timestamp, validation, created_at, deleted";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Paths ───────────────────────────────────────────────────────────────────

pub fn encode_path(path: &Path) -> Result<String> {
  path
    .to_str()
    .map(str::to_owned)
    .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))
}

// ─── Exit codes ──────────────────────────────────────────────────────────────

pub fn encode_exit_code(code: Option<&ExitCode>) -> Option<String> {
  code.map(ExitCode::to_string)
}

// ─── Row structs ─────────────────────────────────────────────────────────────

/// Raw row read from `simulations`, selected with [`RECORD_COLUMNS`].
pub struct RawRecord {
  pub id:         i64,
  pub guid:       String,
  pub directory:  String,
  pub exit_code:  Option<String>,
  pub status:     Option<String>,
  pub percentage: Option<f64>,
  pub timestamp:  Option<String>,
  pub validation: Option<String>,
  pub created_at: String,
  pub deleted:    bool,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      guid:       row.get(1)?,
      directory:  row.get(2)?,
      exit_code:  row.get(3)?,
      status:     row.get(4)?,
      percentage: row.get(5)?,
      timestamp:  row.get(6)?,
      validation: row.get(7)?,
      created_at: row.get(8)?,
      deleted:    row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<SimulationRecord> {
    Ok(SimulationRecord {
      id:         self.id,
      guid:       self.guid,
      directory:  PathBuf::from(self.directory),
      exit_code:  self.exit_code.map(ExitCode::from),
      status:     self.status,
      percentage: self.percentage,
      timestamp:  self.timestamp.as_deref().map(decode_dt).transpose()?,
      validation: self.validation,
      created_at: decode_dt(&self.created_at)?,
      deleted:    self.deleted,
    })
  }
}

/// Raw result of a status-and-validation query.
pub struct RawStatus {
  pub percentage: Option<f64>,
  pub status:     Option<String>,
  pub exit_code:  Option<String>,
  pub timestamp:  Option<String>,
  pub validation: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_sqlite_default_timestamp() {
    let dt = decode_dt("2024-03-01T09:15:02.250Z").unwrap();
    assert_eq!(encode_dt(dt), "2024-03-01T09:15:02.250+00:00");
  }

  #[test]
  fn rejects_garbage_timestamp() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
