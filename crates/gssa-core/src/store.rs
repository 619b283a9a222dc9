//! The `SimulationStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `gssa-store-sqlite`).
//! The supervisor depends on this abstraction, not on any concrete backend.
//!
//! Error handling is split by intent. Opportunistic writes
//! ([`add_or_update`](SimulationStore::add_or_update)) log and swallow their
//! failures. Per-job reads report failure as an absent result. Everything
//! else returns `Result`.

use std::{collections::BTreeMap, future::Future, path::Path};

use chrono::{DateTime, Utc};

use crate::record::{
  ExitCode, Retrieved, SimulationHandle, SimulationRecord, StatusAndValidation,
};

/// How [`SimulationStore::delete`] removes a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
  /// Set the `deleted` flag; the row stays visible to [`SimulationStore::all`].
  #[default]
  Soft,
  /// Remove the row.
  Hard,
}

/// Abstraction over a simulation record store.
///
/// Every call is its own unit of durability; there is no atomicity across
/// calls.
pub trait SimulationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Ensure the backing table exists. Idempotent.
  fn create(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Register a job directory under `guid`, updating the directory if the
  /// GUID is already known. Never fails; problems are logged.
  fn add_or_update<'a>(
    &'a self,
    guid: &'a str,
    directory: &'a Path,
  ) -> impl Future<Output = ()> + Send + 'a;

  /// Write exit code, status, percentage and timestamp in one statement.
  /// `timestamp = None` stamps the current time. Unknown GUIDs are a no-op.
  fn set_status<'a>(
    &'a self,
    guid: &'a str,
    exit_code: Option<ExitCode>,
    status: &'a str,
    percentage: f64,
    timestamp: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Replace the validation blob of a record.
  fn update_validation<'a>(
    &'a self,
    guid: &'a str,
    validation: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Validation blob of a non-deleted record. `None` if unknown, deleted,
  /// not yet validated, or the query failed.
  fn get_validation<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Option<String>> + Send + 'a;

  /// Status fields and validation of a non-deleted record, or `None` on the
  /// same conditions as [`get_validation`](Self::get_validation).
  fn get_status_and_validation<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Option<StatusAndValidation>> + Send + 'a;

  /// Reclassify every record with `percentage < 100` as unfinished with an
  /// unknown exit code. Run once at start-up before any other call.
  /// Returns the number of records rewritten.
  fn mark_all_old(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Number of records whose status is [`IN_PROGRESS`](crate::record::IN_PROGRESS).
  fn active_count(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Every record, including deleted ones and ones whose directory is gone.
  fn all(&self) -> impl Future<Output = Result<Vec<SimulationRecord>, Self::Error>> + Send + '_;

  /// Live records whose GUID starts with `prefix`, keyed by GUID. `None` if
  /// the query failed.
  fn search<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Option<BTreeMap<String, SimulationHandle>>> + Send + 'a;

  /// Exact lookup for a full GUID, prefix search for anything shorter.
  fn retrieve<'a>(
    &'a self,
    guid_or_prefix: &'a str,
  ) -> impl Future<Output = Option<Retrieved>> + Send + 'a;

  /// Delete a record. Deleting an already deleted or unknown GUID is not an
  /// error.
  fn delete<'a>(
    &'a self,
    guid: &'a str,
    mode: DeleteMode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
