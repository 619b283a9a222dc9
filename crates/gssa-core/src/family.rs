//! Solver family capabilities.
//!
//! A family is one way of turning a [`Definition`] into a solver run. Its
//! abilities are split into separate traits so a family can be assembled
//! from independent parts (compiler, executor, validation reader) that it
//! delegates to.

use std::{fmt, future::Future, path::Path};

use serde::{Deserialize, Serialize};

use crate::definition::Definition;

/// Execution state of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
  #[default]
  Pending,
  Running,
  Succeeded,
  Failed,
}

impl JobState {
  pub fn is_terminal(&self) -> bool { matches!(self, Self::Succeeded | Self::Failed) }
}

impl fmt::Display for JobState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::Pending => "pending",
      Self::Running => "running",
      Self::Succeeded => "succeeded",
      Self::Failed => "failed",
    };
    f.write_str(label)
  }
}

/// Common ground of every solver family.
pub trait Family: Send {
  /// Stable identifier, e.g. `elmer-libnuma-legacy`.
  const NAME: &'static str;

  type Error: std::error::Error + Send + Sync + 'static;

  /// Replace the definition this family will compile. Any cached document
  /// is discarded.
  fn load_definition(&mut self, definition: Definition);
}

/// Compiles the loaded definition into the solver's configuration.
pub trait CompilesToDocument: Family {
  type Document;

  /// Build the document on first call, then return the cached copy.
  fn document(&mut self) -> Result<&Self::Document, Self::Error>;
}

/// Runs the solver.
pub trait Executes: Family {
  /// Compile, write the configuration into `working_directory`, run the
  /// solver there and wait for it. `Ok(true)` iff the solver exited
  /// successfully; a failed run is not an error.
  fn simulate<'a>(
    &'a mut self,
    working_directory: &'a Path,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn state(&self) -> JobState;

  /// Post-run cleanup hook.
  fn clean(&mut self) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Artifact export hook.
  fn retrieve_files<'a>(
    &'a self,
    destination: &'a Path,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Reads the solver's validation output.
pub trait Validates: Family {
  /// Flattened validation output of a finished run, JSON-encoded.
  fn validation<'a>(
    &'a self,
    working_directory: &'a Path,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_finished_states_are_terminal() {
    assert!(!JobState::default().is_terminal());
    assert!(!JobState::Running.is_terminal());
    assert!(JobState::Succeeded.is_terminal());
    assert!(JobState::Failed.is_terminal());
  }

  #[test]
  fn state_serialises_lowercase() {
    assert_eq!(serde_json::to_string(&JobState::Succeeded).unwrap(), "\"succeeded\"");
    assert_eq!(JobState::Running.to_string(), "running");
  }
}
