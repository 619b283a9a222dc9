//! Error types for job orchestration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("too many simulations in progress ({active} of {limit})")]
  Busy { active: usize, limit: usize },

  #[error("simulation error: {0}")]
  Simulation(#[from] gssa_elmer::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
