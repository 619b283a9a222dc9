//! The family front: one value per job, delegating to its parts.

use std::{future::Future, path::Path};

use gssa_core::{
  definition::Definition,
  family::{CompilesToDocument, Executes, Family, JobState, Validates},
};
use tracing::Span;

use crate::{
  Error, Result,
  compiler::DefinitionCompiler,
  document::Element,
  executor::JobExecutor,
  mesher::{GssfMesher, MeshCompiler},
  validation::ValidationReader,
};

pub struct ElmerLibNumaLegacy<M = GssfMesher> {
  compiler:  DefinitionCompiler<M>,
  executor:  JobExecutor,
  validator: ValidationReader,
}

impl ElmerLibNumaLegacy<GssfMesher> {
  pub fn new(launcher: impl Into<String>, span: Span) -> Self {
    Self::with_mesher(GssfMesher, launcher, span)
  }
}

impl<M: MeshCompiler> ElmerLibNumaLegacy<M> {
  /// Build a family whose parts all log under `span`.
  pub fn with_mesher(mesher: M, launcher: impl Into<String>, span: Span) -> Self {
    Self {
      compiler:  DefinitionCompiler::new(mesher, span.clone()),
      executor:  JobExecutor::new(launcher, span.clone()),
      validator: ValidationReader::new(span),
    }
  }

  /// Like [`Executes::simulate`], giving up once `cancelled` resolves.
  pub async fn simulate_until(
    &mut self,
    working_directory: &Path,
    cancelled: impl Future<Output = ()> + Send,
  ) -> Result<bool> {
    self
      .executor
      .simulate_until(&mut self.compiler, working_directory, cancelled)
      .await
  }

  /// Exit code of the finished solver process, if it exited normally.
  pub fn exit_code(&self) -> Option<i32> { self.executor.exit_code() }

  pub fn executor_mut(&mut self) -> &mut JobExecutor { &mut self.executor }
}

impl<M: MeshCompiler> Family for ElmerLibNumaLegacy<M> {
  const NAME: &'static str = "elmer-libnuma-legacy";

  type Error = Error;

  fn load_definition(&mut self, definition: Definition) { self.compiler.load(definition); }
}

impl<M: MeshCompiler> CompilesToDocument for ElmerLibNumaLegacy<M> {
  type Document = Element;

  fn document(&mut self) -> Result<&Element> { self.compiler.compile() }
}

impl<M: MeshCompiler> Executes for ElmerLibNumaLegacy<M> {
  fn simulate<'a>(
    &'a mut self,
    working_directory: &'a Path,
  ) -> impl Future<Output = Result<bool>> + Send + 'a {
    self
      .executor
      .simulate(&mut self.compiler, working_directory)
  }

  fn state(&self) -> JobState { self.executor.state() }

  fn clean(&mut self) -> impl Future<Output = Result<bool>> + Send + '_ {
    std::future::ready(Ok(true))
  }

  fn retrieve_files<'a>(
    &'a self,
    _destination: &'a Path,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    std::future::ready(Ok(()))
  }
}

impl<M: MeshCompiler> Validates for ElmerLibNumaLegacy<M> {
  fn validation<'a>(
    &'a self,
    working_directory: &'a Path,
  ) -> impl Future<Output = Result<String>> + Send + 'a {
    self.validator.read(working_directory)
  }
}
