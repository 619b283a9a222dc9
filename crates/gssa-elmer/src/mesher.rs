//! Mesh/geometry section of the solver configuration.
//!
//! The meshing schema belongs to the launcher; the compiler only needs a
//! root element to hang its own sections off. [`GssfMesher`] renders the
//! plain GSSF layout: constants, needle geometry and regions.

use gssa_core::definition::Definition;

use crate::{Result, document::Element};

/// Renders the base document the compiler extends.
pub trait MeshCompiler: Send + Sync {
  fn to_mesh_xml(&self, definition: &Definition) -> Result<Element>;
}

/// Root tag of the GSSF configuration.
pub const ROOT_TAG: &str = "gssf";

#[derive(Debug, Clone, Default)]
pub struct GssfMesher;

impl MeshCompiler for GssfMesher {
  fn to_mesh_xml(&self, definition: &Definition) -> Result<Element> {
    let mut root = Element::new(ROOT_TAG);

    let constants = root.sub("constants");
    for (name, parameter) in &definition.parameters {
      let value = parameter.convert(name)?;
      constants
        .sub("constant")
        .set("name", name.as_str())
        .set("type", parameter.typ.to_string())
        .set("value", value.to_string());
    }

    let geometry = root.sub("geometry");
    for needle in &definition.needles {
      geometry
        .sub("needle")
        .set("id", needle.id.as_str())
        .set("file", needle.file.as_str());
    }

    let regions = root.sub("regions");
    for (name, region) in &definition.regions {
      let el = regions.sub("region");
      el.set("name", name.as_str());
      if let Some(format) = &region.format {
        el.set("format", format.as_str());
      }
      if let Some(input) = &region.input {
        el.set("input", input.as_str());
      }
      el.set("groups", region.groups.join("; "));
    }

    Ok(root)
  }
}
