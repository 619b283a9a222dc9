//! [`Supervisor`]: one job from registration to recorded outcome.
//!
//! A run is a sequence of independent store calls; each commits on its own.
//! The record reads `IN_PROGRESS` while the solver runs and carries a
//! terminal status once `run` returns, whatever the outcome. Dropping the
//! `run` future (a caller-imposed timeout, say) kills the solver and records
//! the job as cancelled from a spawned task.

use std::{
  future::Future,
  path::{Path, PathBuf},
};

use gssa_core::{
  definition::Definition,
  family::{Family, Validates},
  record::{ExitCode, IN_PROGRESS},
  store::SimulationStore,
};
use gssa_elmer::ElmerLibNumaLegacy;
use tracing::Span;

use crate::{Error, Result, SupervisorConfig};

/// Status label of a job whose solver exited successfully.
pub const SUCCESS: &str = "SUCCESS";

/// Status label of a job cancelled by its caller.
pub const CANCELLED: &str = "Cancelled";

pub struct Supervisor<S> {
  store:  S,
  config: SupervisorConfig,
  span:   Span,
}

impl<S: SimulationStore> Supervisor<S> {
  pub fn new(store: S, config: SupervisorConfig, span: Span) -> Self {
    Self { store, config, span }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &SupervisorConfig { &self.config }

  /// Reclassify records left unfinished by a previous process. Must run
  /// before anything else touches the store.
  pub async fn start(&self) -> Result<usize> {
    let swept = self.store.mark_all_old().await.map_err(Error::store)?;
    if swept > 0 {
      tracing::info!(parent: &self.span, swept, "reclassified unfinished simulations");
    }
    Ok(swept)
  }

  pub fn job_directory(&self, guid: &str) -> PathBuf { self.config.work_root.join(guid) }

  /// Fail with [`Error::Busy`] if `max_active` runs are already in progress.
  pub async fn admit(&self) -> Result<()> {
    let Some(limit) = self.config.max_active else {
      return Ok(());
    };
    let active = self.store.active_count().await.map_err(Error::store)?;
    if active >= limit {
      return Err(Error::Busy { active, limit });
    }
    Ok(())
  }
}

impl<S: SimulationStore + Clone + 'static> Supervisor<S> {
  /// Run `definition` as job `guid` until the solver exits or `cancelled`
  /// resolves, and record the outcome.
  ///
  /// A solver that exits is a completed run: its exit code is returned and
  /// recorded. Compilation failures (`E_MODEL`), environmental failures and
  /// cancellation (`E_UNKNOWN`) are recorded and then returned as errors.
  pub async fn run(
    &self,
    guid: &str,
    definition: Definition,
    cancelled: impl Future<Output = ()> + Send,
  ) -> Result<ExitCode> {
    self.admit().await?;

    let span = tracing::info_span!(parent: &self.span, "simulation", guid);
    let directory = self.job_directory(guid);
    tokio::fs::create_dir_all(&directory).await?;

    self.store.add_or_update(guid, &directory).await;
    self
      .store
      .set_status(guid, None, IN_PROGRESS, 0.0, None)
      .await
      .map_err(Error::store)?;
    let mut guard = CancelOnDrop {
      store: Some(self.store.clone()),
      guid:  guid.to_owned(),
      span:  span.clone(),
    };

    let mut family = ElmerLibNumaLegacy::new(self.config.launcher.as_str(), span.clone());
    family.load_definition(definition);
    tracing::info!(parent: &span, family = <ElmerLibNumaLegacy as Family>::NAME, "simulation starting");

    let result = family.simulate_until(&directory, cancelled).await;

    let (exit_code, status, percentage) = match &result {
      Ok(true) => (ExitCode::Success, SUCCESS.to_owned(), 100.0),
      Ok(false) => {
        let code = ExitCode::from_process(family.exit_code());
        let status = format!("Failed (exit code {code})");
        (code, status, 100.0)
      }
      Err(gssa_elmer::Error::Cancelled) => (ExitCode::Unknown, CANCELLED.to_owned(), 0.0),
      Err(e) if e.is_definition_error() => (ExitCode::Model, format!("Failed: {e}"), 100.0),
      Err(e) => (ExitCode::Unknown, format!("Failed: {e}"), 100.0),
    };

    let recorded = self
      .store
      .set_status(guid, Some(exit_code.clone()), &status, percentage, None)
      .await;
    guard.disarm();
    recorded.map_err(Error::store)?;
    tracing::info!(parent: &span, exit_code = %exit_code, status = %status, "simulation finished");

    match result {
      Ok(true) => {
        self.record_validation(&family, guid, &directory, &span).await;
        Ok(exit_code)
      }
      Ok(false) => Ok(exit_code),
      Err(e) => Err(e.into()),
    }
  }

  /// Store the flattened validation output of a successful run. A missing
  /// or unreadable file leaves the job succeeded without validation.
  async fn record_validation(
    &self,
    family: &ElmerLibNumaLegacy,
    guid: &str,
    directory: &Path,
    span: &Span,
  ) {
    let validation = match family.validation(directory).await {
      Ok(validation) => validation,
      Err(e) => {
        tracing::warn!(parent: span, "could not read validation output: {e}");
        return;
      }
    };
    if let Err(e) = self.store.update_validation(guid, &validation).await {
      tracing::error!(parent: span, "could not store validation output: {e}");
    }
  }
}

/// Records its job as cancelled if dropped before [`disarm`](Self::disarm).
struct CancelOnDrop<S: SimulationStore + 'static> {
  store: Option<S>,
  guid:  String,
  span:  Span,
}

impl<S: SimulationStore + 'static> CancelOnDrop<S> {
  fn disarm(&mut self) { self.store = None; }
}

impl<S: SimulationStore + 'static> Drop for CancelOnDrop<S> {
  fn drop(&mut self) {
    let Some(store) = self.store.take() else {
      return;
    };
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      tracing::warn!(parent: &self.span, "simulation dropped outside a runtime; left in progress");
      return;
    };

    let guid = std::mem::take(&mut self.guid);
    let span = self.span.clone();
    handle.spawn(async move {
      match store
        .set_status(&guid, Some(ExitCode::Unknown), CANCELLED, 0.0, None)
        .await
      {
        Ok(()) => tracing::warn!(parent: &span, "simulation dropped before completion"),
        Err(e) => tracing::error!(parent: &span, "could not record dropped simulation: {e}"),
      }
    });
  }
}
