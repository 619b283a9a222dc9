//! Simulation records, the durable state of one job.
//!
//! A record is keyed by its GUID. Liveness has two independent signals: the
//! `deleted` flag in the store, and the existence of the job directory on
//! disk. Handles are only ever built for records that pass both.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a full GUID; shorter lookups are treated as prefixes.
pub const GUID_LENGTH: usize = 32;

/// Status label of a job whose solver process is running.
pub const IN_PROGRESS: &str = "IN_PROGRESS";

/// Generate a new 32-character GUID.
pub fn new_guid() -> String { Uuid::new_v4().simple().to_string() }

// ─── Exit codes ──────────────────────────────────────────────────────────────

/// Terminal code of a job, stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ExitCode {
  Success,
  /// The job ended without the supervisor observing how.
  Unknown,
  /// The definition could not be compiled; no process was started.
  Model,
  /// Non-zero process exit status.
  Code(i32),
  /// A code written by some other tool.
  Other(String),
}

impl ExitCode {
  /// Map a process exit status; `None` means killed by a signal.
  pub fn from_process(code: Option<i32>) -> Self {
    match code {
      Some(0) => Self::Success,
      Some(n) => Self::Code(n),
      None => Self::Unknown,
    }
  }

  pub fn is_success(&self) -> bool { matches!(self, Self::Success) }
}

impl fmt::Display for ExitCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Success => f.write_str("SUCCESS"),
      Self::Unknown => f.write_str("E_UNKNOWN"),
      Self::Model => f.write_str("E_MODEL"),
      Self::Code(n) => write!(f, "{n}"),
      Self::Other(s) => f.write_str(s),
    }
  }
}

impl From<&str> for ExitCode {
  fn from(s: &str) -> Self {
    match s {
      "SUCCESS" => Self::Success,
      "E_UNKNOWN" => Self::Unknown,
      "E_MODEL" => Self::Model,
      other => other
        .parse()
        .map(Self::Code)
        .unwrap_or_else(|_| Self::Other(other.to_owned())),
    }
  }
}

impl From<String> for ExitCode {
  fn from(s: String) -> Self { Self::from(s.as_str()) }
}

impl From<ExitCode> for String {
  fn from(code: ExitCode) -> Self { code.to_string() }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One row of the simulations table, unfiltered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRecord {
  pub id:         i64,
  pub guid:       String,
  pub directory:  PathBuf,
  pub exit_code:  Option<ExitCode>,
  pub status:     Option<String>,
  pub percentage: Option<f64>,
  pub timestamp:  Option<DateTime<Utc>>,
  /// JSON-encoded validation output.
  pub validation: Option<String>,
  pub created_at: DateTime<Utc>,
  pub deleted:    bool,
}

/// Result of [`SimulationStore::get_status_and_validation`](crate::store::SimulationStore::get_status_and_validation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAndValidation {
  pub percentage: Option<f64>,
  pub status:     Option<String>,
  pub exit_code:  Option<ExitCode>,
  pub timestamp:  Option<DateTime<Utc>>,
  pub validation: Option<String>,
}

/// Last reported progress of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
  pub percentage: Option<f64>,
  pub message:    Option<String>,
  pub timestamp:  Option<DateTime<Utc>>,
}

/// A finalized, read-only view of a stored simulation.
///
/// Handles are never live: they do not own a running process and cannot be
/// simulated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationHandle {
  pub guid:      String,
  pub directory: PathBuf,
  pub status:    StatusSnapshot,
  pub exit_code: Option<ExitCode>,
}

impl SimulationHandle {
  pub fn from_record(record: SimulationRecord) -> Self {
    Self {
      guid:      record.guid,
      directory: record.directory,
      status:    StatusSnapshot {
        percentage: record.percentage,
        message:    record.status,
        timestamp:  record.timestamp,
      },
      exit_code: record.exit_code,
    }
  }

  pub fn is_finished(&self) -> bool { self.exit_code.is_some() }
}

/// Outcome of a GUID-or-prefix lookup.
#[derive(Debug, Clone)]
pub enum Retrieved {
  /// Exact GUID match.
  One(SimulationHandle),
  /// Prefix lookup, keyed by full GUID.
  Matches(BTreeMap<String, SimulationHandle>),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exit_code_text_roundtrip() {
    for code in [
      ExitCode::Success,
      ExitCode::Unknown,
      ExitCode::Model,
      ExitCode::Code(3),
      ExitCode::Other("E_SERVER".into()),
    ] {
      assert_eq!(ExitCode::from(code.to_string()), code);
    }
  }

  #[test]
  fn exit_code_from_process() {
    assert_eq!(ExitCode::from_process(Some(0)), ExitCode::Success);
    assert_eq!(ExitCode::from_process(Some(2)), ExitCode::Code(2));
    assert_eq!(ExitCode::from_process(None), ExitCode::Unknown);
  }

  #[test]
  fn new_guid_is_full_length() {
    let guid = new_guid();
    assert_eq!(guid.len(), GUID_LENGTH);
    assert!(guid.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
