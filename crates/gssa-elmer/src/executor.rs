//! Solver process supervision.
//!
//! A [`JobExecutor`] drives one job from `Pending` to a terminal state. The
//! only suspension point is the wait on the child process; callers cancel a
//! run by resolving the future handed to
//! [`simulate_until`](JobExecutor::simulate_until), or by dropping the
//! simulate future altogether. Both kill the child.

use std::{
  future::Future,
  path::{Path, PathBuf},
  process::{ExitStatus, Stdio},
};

use gssa_core::family::JobState;
use tokio::process::Command;
use tracing::Span;

use crate::{
  CONFIG_FILE, Error, Result, STATUS_SOCKET_FILE,
  arguments::LauncherArguments,
  compiler::DefinitionCompiler,
  mesher::MeshCompiler,
};

/// Where the solver reports progress for a job in `working_directory`.
pub fn status_socket_path(working_directory: &Path) -> PathBuf {
  working_directory.join(STATUS_SOCKET_FILE)
}

pub struct JobExecutor {
  launcher:  String,
  arguments: LauncherArguments,
  state:     JobState,
  exit:      Option<ExitStatus>,
  span:      Span,
}

impl JobExecutor {
  pub fn new(launcher: impl Into<String>, span: Span) -> Self {
    Self {
      launcher: launcher.into(),
      arguments: LauncherArguments::new([CONFIG_FILE]),
      state: JobState::Pending,
      exit: None,
      span,
    }
  }

  pub fn state(&self) -> JobState { self.state }

  /// Process exit code of the finished run; `None` before exit or when the
  /// process was killed by a signal.
  pub fn exit_code(&self) -> Option<i32> { self.exit.and_then(|s| s.code()) }

  pub fn arguments_mut(&mut self) -> &mut LauncherArguments { &mut self.arguments }

  /// Run to completion. See [`simulate_until`](Self::simulate_until).
  pub async fn simulate<M: MeshCompiler>(
    &mut self,
    compiler: &mut DefinitionCompiler<M>,
    working_directory: &Path,
  ) -> Result<bool> {
    self
      .simulate_until(compiler, working_directory, std::future::pending())
      .await
  }

  /// Compile, write `settings.xml`, launch the solver in
  /// `working_directory` and wait for it to exit or for `cancelled` to
  /// resolve, whichever comes first.
  ///
  /// Returns `Ok(true)` on a zero exit status and `Ok(false)` on any other
  /// exit. Compilation and spawn failures, and cancellation, leave the job
  /// `Failed` and are returned as errors.
  pub async fn simulate_until<M, F>(
    &mut self,
    compiler: &mut DefinitionCompiler<M>,
    working_directory: &Path,
    cancelled: F,
  ) -> Result<bool>
  where
    M: MeshCompiler,
    F: Future<Output = ()> + Send,
  {
    if self.state != JobState::Pending {
      return Err(Error::NotPending(self.state));
    }

    let mut command = match self.prepare(compiler, working_directory).await {
      Ok(command) => command,
      Err(e) => {
        self.state = JobState::Failed;
        return Err(e);
      }
    };

    let mut child = match command.spawn() {
      Ok(child) => child,
      Err(e) => {
        self.state = JobState::Failed;
        tracing::error!(parent: &self.span, launcher = %self.launcher, "could not start solver: {e}");
        return Err(e.into());
      }
    };
    self.state = JobState::Running;
    tracing::info!(
      parent: &self.span,
      pid = child.id(),
      directory = %working_directory.display(),
      "solver started"
    );

    let status = tokio::select! {
      status = child.wait() => status,
      () = cancelled => {
        if let Err(e) = child.kill().await {
          tracing::warn!(parent: &self.span, "could not kill solver: {e}");
        }
        self.state = JobState::Failed;
        tracing::warn!(parent: &self.span, "simulation cancelled");
        return Err(Error::Cancelled);
      }
    };

    let status = match status {
      Ok(status) => status,
      Err(e) => {
        self.state = JobState::Failed;
        return Err(e.into());
      }
    };

    self.exit = Some(status);
    let success = status.success();
    self.state = if success { JobState::Succeeded } else { JobState::Failed };
    tracing::info!(parent: &self.span, code = status.code(), state = %self.state, "solver exited");
    Ok(success)
  }

  async fn prepare<M: MeshCompiler>(
    &mut self,
    compiler: &mut DefinitionCompiler<M>,
    working_directory: &Path,
  ) -> Result<Command> {
    let document = compiler.compile()?;
    document.write_to(&working_directory.join(CONFIG_FILE)).await?;

    self.arguments.status_socket = Some(status_socket_path(working_directory));

    let mut command = Command::new(&self.launcher);
    command
      .args(self.arguments.to_argv())
      .current_dir(working_directory)
      .stdin(Stdio::null())
      .kill_on_drop(true);
    Ok(command)
  }
}
