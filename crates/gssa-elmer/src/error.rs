//! Error types for the Elmer family.

use std::path::PathBuf;

use gssa_core::family::JobState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown point source distribution method: {0}")]
  UnknownPointSourceMethod(String),

  #[error("disallowed function appeared in algorithm {0}")]
  DisallowedFunctionDetected(String),

  #[error("too many segmented lesions (>1) for validation: {0:?}")]
  TooManySegmentedLesions(Vec<String>),

  #[error("validation file not found: {0:?}")]
  ValidationFileMissing(PathBuf),

  #[error("validation XML did not have a {expected} root tag (found {found})")]
  ValidationSchemaMismatch {
    expected: &'static str,
    found:    String,
  },

  #[error("no definition loaded")]
  NoDefinition,

  #[error("simulation already {0}")]
  NotPending(JobState),

  #[error("simulation cancelled")]
  Cancelled,

  #[error("definition error: {0}")]
  Definition(#[from] gssa_core::Error),

  #[error("xml error: {0}")]
  Xml(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Whether the error is a policy rejection of the definition itself, as
  /// opposed to an environmental failure.
  pub fn is_definition_error(&self) -> bool {
    matches!(
      self,
      Self::UnknownPointSourceMethod(_)
        | Self::DisallowedFunctionDetected(_)
        | Self::TooManySegmentedLesions(_)
        | Self::NoDefinition
        | Self::Definition(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
