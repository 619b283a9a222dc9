//! Typed simulation parameters.
//!
//! Definitions arrive with every parameter as a raw string plus a type tag.
//! Each tag has exactly one conversion into a [`ParameterValue`]; there is no
//! guessing at runtime.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Type tags ───────────────────────────────────────────────────────────────

/// The declared type of a raw parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
  Float,
  Integer,
  Boolean,
  String,
  /// JSON array of strings, e.g. `["a", "b"]`.
  StringList,
  /// JSON array of numbers, e.g. `[0.0, 5.5]`.
  FloatList,
  /// JSON array of 3-D points, e.g. `[[0, 0, 1], [1, 0, 1]]`.
  Coordinates,
}

impl fmt::Display for ParameterType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Float => "float",
      Self::Integer => "integer",
      Self::Boolean => "boolean",
      Self::String => "string",
      Self::StringList => "string_list",
      Self::FloatList => "float_list",
      Self::Coordinates => "coordinates",
    };
    f.write_str(name)
  }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// A point in solver space.
pub type Point3 = [f64; 3];

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
  Float(f64),
  Integer(i64),
  Boolean(bool),
  String(String),
  StringList(Vec<String>),
  FloatList(Vec<f64>),
  Coordinates(Vec<Point3>),
}

impl ParameterValue {
  pub fn parameter_type(&self) -> ParameterType {
    match self {
      Self::Float(_) => ParameterType::Float,
      Self::Integer(_) => ParameterType::Integer,
      Self::Boolean(_) => ParameterType::Boolean,
      Self::String(_) => ParameterType::String,
      Self::StringList(_) => ParameterType::StringList,
      Self::FloatList(_) => ParameterType::FloatList,
      Self::Coordinates(_) => ParameterType::Coordinates,
    }
  }

  /// Numeric view; integers widen to `f64`.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Float(v) => Some(*v),
      Self::Integer(v) => Some(*v as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_string_list(&self) -> Option<&[String]> {
    match self {
      Self::StringList(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_float_list(&self) -> Option<&[f64]> {
    match self {
      Self::FloatList(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_coordinates(&self) -> Option<&[Point3]> {
    match self {
      Self::Coordinates(v) => Some(v),
      _ => None,
    }
  }
}

impl fmt::Display for ParameterValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Float(v) => write!(f, "{v}"),
      Self::Integer(v) => write!(f, "{v}"),
      Self::Boolean(v) => write!(f, "{v}"),
      Self::String(v) => f.write_str(v),
      Self::StringList(v) => f.write_str(&v.join("; ")),
      Self::FloatList(v) => {
        let parts: Vec<String> = v.iter().map(f64::to_string).collect();
        f.write_str(&parts.join(", "))
      }
      Self::Coordinates(v) => {
        let parts: Vec<String> = v
          .iter()
          .map(|[x, y, z]| format!("({x}, {y}, {z})"))
          .collect();
        f.write_str(&parts.join(", "))
      }
    }
  }
}

// ─── Raw parameters ──────────────────────────────────────────────────────────

/// A parameter as it appears in a definition: unparsed text plus its tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
  pub value: String,
  #[serde(rename = "type")]
  pub typ:   ParameterType,
}

impl Parameter {
  pub fn new(typ: ParameterType, value: impl Into<String>) -> Self {
    Self { value: value.into(), typ }
  }

  /// Convert the raw text according to its tag. `key` is only used for
  /// error reporting.
  pub fn convert(&self, key: &str) -> Result<ParameterValue> {
    let raw = self.value.trim();
    let invalid = || Error::InvalidParameter {
      key:   key.to_owned(),
      typ:   self.typ,
      value: self.value.clone(),
    };

    match self.typ {
      ParameterType::Float => convert_float(raw).ok_or_else(invalid),
      ParameterType::Integer => convert_integer(raw).ok_or_else(invalid),
      ParameterType::Boolean => convert_boolean(raw).ok_or_else(invalid),
      ParameterType::String => Ok(ParameterValue::String(self.value.clone())),
      ParameterType::StringList => convert_string_list(raw).ok_or_else(invalid),
      ParameterType::FloatList => convert_float_list(raw).ok_or_else(invalid),
      ParameterType::Coordinates => convert_coordinates(raw).ok_or_else(invalid),
    }
  }
}

/// Parameters keyed by name.
pub type ParameterMap = BTreeMap<String, Parameter>;

fn convert_float(raw: &str) -> Option<ParameterValue> {
  raw.parse().ok().map(ParameterValue::Float)
}

fn convert_integer(raw: &str) -> Option<ParameterValue> {
  raw.parse().ok().map(ParameterValue::Integer)
}

fn convert_boolean(raw: &str) -> Option<ParameterValue> {
  match raw.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" => Some(ParameterValue::Boolean(true)),
    "false" | "0" | "no" => Some(ParameterValue::Boolean(false)),
    _ => None,
  }
}

fn convert_string_list(raw: &str) -> Option<ParameterValue> {
  serde_json::from_str(raw).ok().map(ParameterValue::StringList)
}

fn convert_float_list(raw: &str) -> Option<ParameterValue> {
  serde_json::from_str(raw).ok().map(ParameterValue::FloatList)
}

fn convert_coordinates(raw: &str) -> Option<ParameterValue> {
  serde_json::from_str(raw).ok().map(ParameterValue::Coordinates)
}
