//! Error types for `gssa-core`.

use thiserror::Error;

use crate::parameter::ParameterType;

#[derive(Debug, Error)]
pub enum Error {
  #[error("parameter {key:?} could not be read as {typ}: {value:?}")]
  InvalidParameter {
    key:   String,
    typ:   ParameterType,
    value: String,
  },

  #[error("parameter {key:?} is {found}, expected {expected}")]
  ParameterTypeMismatch {
    key:      String,
    expected: &'static str,
    found:    ParameterType,
  },

  #[error("required parameter {0:?} is missing")]
  MissingParameter(String),

  #[error("needle not found: {0}")]
  NeedleNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
