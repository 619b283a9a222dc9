//! The structured simulation definition handed to a solver family.
//!
//! A definition is transient: it is built from the caller's input, consumed
//! once by a family's compiler and never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  parameter::{ParameterMap, ParameterValue},
};

/// Region group marking a segmented lesion used as validation reference.
pub const SEGMENTED_LESIONS_GROUP: &str = "segmented-lesions";

// ─── Needles ─────────────────────────────────────────────────────────────────

/// How a needle enters the solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeedleClass {
  /// Modelled as a set of point source terms.
  PointSources,
  /// Modelled as a meshed boundary surface.
  SolidBoundary,
  #[serde(other)]
  Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Needle {
  pub id:         String,
  pub class:      NeedleClass,
  /// `method:variant` locator, e.g. `library:straight tines`.
  pub file:       String,
  #[serde(default)]
  pub parameters: ParameterMap,
}

impl Needle {
  pub fn parameter(&self, key: &str) -> Result<Option<ParameterValue>> {
    convert(&self.parameters, key)
  }
}

// ─── Algorithms and regions ──────────────────────────────────────────────────

/// A user-supplied snippet computing one named result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Algorithm {
  #[serde(default)]
  pub arguments: Vec<String>,
  #[serde(default)]
  pub content:   Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Region {
  /// Geometry format understood by the mesher (e.g. `surface`, `zone`).
  #[serde(default)]
  pub format: Option<String>,
  /// Input file for the region, relative to the job's input directory.
  #[serde(default)]
  pub input:  Option<String>,
  #[serde(default)]
  pub groups: Vec<String>,
}

impl Region {
  pub fn in_group(&self, group: &str) -> bool {
    self.groups.iter().any(|g| g == group)
  }
}

// ─── Definition ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Definition {
  /// Raw templated solver script.
  #[serde(default)]
  pub script:     String,
  #[serde(default)]
  pub parameters: ParameterMap,
  #[serde(default)]
  pub needles:    Vec<Needle>,
  /// Keyed by the name of the value each algorithm computes.
  #[serde(default)]
  pub algorithms: BTreeMap<String, Algorithm>,
  #[serde(default)]
  pub regions:    BTreeMap<String, Region>,
}

impl Definition {
  /// Look up and convert a global parameter. `Ok(None)` if absent.
  pub fn parameter(&self, key: &str) -> Result<Option<ParameterValue>> {
    convert(&self.parameters, key)
  }

  /// Look up a needle by id. A purely numeric index that matches no id is
  /// read as a position in the needle list.
  pub fn needle(&self, index: &str) -> Result<&Needle> {
    if let Some(needle) = self.needles.iter().find(|n| n.id == index) {
      return Ok(needle);
    }
    index
      .parse::<usize>()
      .ok()
      .and_then(|position| self.needles.get(position))
      .ok_or_else(|| Error::NeedleNotFound(index.to_owned()))
  }

  pub fn needle_parameter(&self, index: &str, key: &str) -> Result<Option<ParameterValue>> {
    self.needle(index)?.parameter(key)
  }

  /// Names of regions tagged as segmented lesions.
  pub fn segmented_lesions(&self) -> Vec<&str> {
    self
      .regions
      .iter()
      .filter(|(_, r)| r.in_group(SEGMENTED_LESIONS_GROUP))
      .map(|(name, _)| name.as_str())
      .collect()
  }
}

fn convert(parameters: &ParameterMap, key: &str) -> Result<Option<ParameterValue>> {
  parameters.get(key).map(|p| p.convert(key)).transpose()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parameter::{Parameter, ParameterType};

  fn definition() -> Definition {
    serde_json::from_str(
      r#"{
        "script": "Simulation ...",
        "parameters": {
          "CONSTANT_NEEDLE_EXTENSIONS": { "value": "[5, 10]", "type": "float_list" }
        },
        "needles": [
          {
            "id": "needle-a",
            "class": "point-sources",
            "file": "library:straight tines",
            "parameters": {
              "NEEDLE_PRONGS_LOCATIONS": { "value": "[[0, 0, 1]]", "type": "coordinates" }
            }
          },
          { "id": "needle-b", "class": "solid-boundary", "file": "library:umbrella" },
          { "id": "needle-c", "class": "cryo-probe", "file": "library:x" }
        ],
        "regions": {
          "tumour": { "format": "surface", "groups": ["tumours"] },
          "ablation": { "groups": ["segmented-lesions"] }
        }
      }"#,
    )
    .unwrap()
  }

  #[test]
  fn deserializes_needle_classes() {
    let d = definition();
    assert_eq!(d.needles[0].class, NeedleClass::PointSources);
    assert_eq!(d.needles[1].class, NeedleClass::SolidBoundary);
    assert_eq!(d.needles[2].class, NeedleClass::Other);
  }

  #[test]
  fn needle_lookup_by_id_then_position() {
    let d = definition();
    assert_eq!(d.needle("needle-b").unwrap().id, "needle-b");
    assert_eq!(d.needle("0").unwrap().id, "needle-a");
    assert!(matches!(d.needle("7"), Err(Error::NeedleNotFound(_))));
  }

  #[test]
  fn needle_parameter_converts() {
    let d = definition();
    let prongs = d
      .needle_parameter("needle-a", "NEEDLE_PRONGS_LOCATIONS")
      .unwrap()
      .unwrap();
    assert_eq!(prongs.as_coordinates().unwrap().len(), 1);
    assert!(d.needle_parameter("needle-b", "NEEDLE_PRONGS_LOCATIONS").unwrap().is_none());
  }

  #[test]
  fn absent_parameter_is_none() {
    let mut d = definition();
    assert!(d.parameter("SETTING_LESION_FIELD").unwrap().is_none());
    d.parameters.insert(
      "SETTING_LESION_FIELD".into(),
      Parameter::new(ParameterType::String, "dead"),
    );
    assert_eq!(
      d.parameter("SETTING_LESION_FIELD").unwrap(),
      Some(ParameterValue::String("dead".into()))
    );
  }

  #[test]
  fn segmented_lesions_by_group() {
    assert_eq!(definition().segmented_lesions(), vec!["ablation"]);
  }
}
