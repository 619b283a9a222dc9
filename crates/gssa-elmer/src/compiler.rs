//! Definition → `settings.xml` compiler.
//!
//! Algorithm content may come from a less trusted caller and is pasted
//! verbatim into a script the solver executes. The denylist scan in
//! [`render`] is the only thing standing between that content and the
//! solver, so every algorithm is checked before anything is returned.

use gssa_core::{
  definition::{Definition, Needle, NeedleClass},
  parameter::{ParameterValue, Point3},
};
use tracing::Span;

use crate::{
  Error, Result,
  document::Element,
  mesher::{GssfMesher, MeshCompiler},
};

// ─── Well-known parameters ───────────────────────────────────────────────────

pub const MODULES: &str = "ELMER_NUMA_MODULES";
pub const NEEDLE_EXTENSIONS: &str = "CONSTANT_NEEDLE_EXTENSIONS";
pub const PRONG_LOCATIONS: &str = "NEEDLE_PRONGS_LOCATIONS";
pub const LESION_FIELD: &str = "SETTING_LESION_FIELD";
pub const LESION_THRESHOLD_UPPER: &str = "SETTING_LESION_THRESHOLD_UPPER";
pub const LESION_THRESHOLD_LOWER: &str = "SETTING_LESION_THRESHOLD_LOWER";

/// Placeholder the launcher expands into the generated source terms.
pub const SOURCES_PLACEHOLDER: &str = "{{ p.SOURCES }}";

/// Names that may not appear in algorithm content or result names: file I/O,
/// dynamic evaluation, formatted I/O and serialisation primitives.
pub const DISALLOWED_FUNCTIONS: &[&str] = &[
  "funcdel", "sprintf", "sscanf", "eval", "source", "fread", "fscanf", "fgets", "fwrite",
  "fprintf", "fputs", "fopen", "freopen", "fclose", "save", "load", "format",
];

const LIBRARY_METHOD: &str = "library";
const STRAIGHT_TINES: &str = "straight tines";
const EXTRAPOLATED: &str = "extrapolated";

// ─── Compiler ────────────────────────────────────────────────────────────────

/// Compiles one definition and keeps the result.
pub struct DefinitionCompiler<M = GssfMesher> {
  mesher:     M,
  definition: Option<Definition>,
  cached:     Option<Element>,
  span:       Span,
}

impl<M: MeshCompiler> DefinitionCompiler<M> {
  pub fn new(mesher: M, span: Span) -> Self {
    Self { mesher, definition: None, cached: None, span }
  }

  /// Replace the definition and drop any cached document.
  pub fn load(&mut self, definition: Definition) {
    self.definition = Some(definition);
    self.cached = None;
  }

  pub fn definition(&self) -> Option<&Definition> { self.definition.as_ref() }

  /// Render the document once; later calls return the cached copy.
  pub fn compile(&mut self) -> Result<&Element> {
    let document = match self.cached.take() {
      Some(document) => document,
      None => {
        let definition = self.definition.as_ref().ok_or(Error::NoDefinition)?;
        let document = render(&self.mesher, definition).inspect_err(|e| {
          tracing::error!(parent: &self.span, "could not prepare simulation XML: {e}");
        })?;
        tracing::debug!(parent: &self.span, "compiled simulation definition");
        document
      }
    };
    Ok(self.cached.insert(document))
  }
}

// ─── Rendering ───────────────────────────────────────────────────────────────

/// Build the full solver document for `definition`.
pub fn render(mesher: &impl MeshCompiler, definition: &Definition) -> Result<Element> {
  let mut root = mesher.to_mesh_xml(definition)?;

  let elmer = root.sub("elmer");
  elmer.push(variant(definition)?);

  for needle in &definition.needles {
    if needle.class == NeedleClass::PointSources {
      elmer.push(point_sources(definition, needle)?);
    }
  }

  let algorithms = elmer.sub("algorithms");
  for (result, algorithm) in &definition.algorithms {
    let content = algorithm.content.as_deref().unwrap_or_default();
    check_allowed(result, content)?;

    let el = algorithms.sub("algorithm");
    el.set("result", result.as_str())
      .set("arguments", algorithm.arguments.join(","));

    let mut sorted = algorithm.arguments.clone();
    sorted.sort();
    let arguments = el.sub("arguments");
    for argument in sorted {
      arguments.sub("argument").set("name", argument);
    }
    el.push(Element::new("content").with_text(content));
  }

  root.push(lesion(definition)?);

  let segmented = definition.segmented_lesions();
  match segmented.as_slice() {
    [] => {}
    [reference] => {
      root.sub("validation").set("reference", *reference);
    }
    _ => {
      return Err(Error::TooManySegmentedLesions(
        segmented.iter().map(|s| s.to_string()).collect(),
      ));
    }
  }

  Ok(root)
}

/// Reject algorithms mentioning a disallowed function in their content or
/// result name.
pub fn check_allowed(result: &str, content: &str) -> Result<()> {
  let hit = DISALLOWED_FUNCTIONS
    .iter()
    .any(|f| content.contains(f) || result.contains(f));
  if hit {
    return Err(Error::DisallowedFunctionDetected(result.to_owned()));
  }
  Ok(())
}

fn variant(definition: &Definition) -> Result<Element> {
  let text = format!("{}\n{SOURCES_PLACEHOLDER}\n", definition.script);
  let mut el = Element::new("variant").with_text(text);

  if let Some(modules) = definition.parameter(MODULES)? {
    let modules = expect(MODULES, &modules, "string list", ParameterValue::as_string_list)?;
    if !modules.is_empty() {
      el.set("modules", modules.join("; "));
    }
  }
  Ok(el)
}

fn point_sources(definition: &Definition, needle: &Needle) -> Result<Element> {
  let (method, variant) = needle
    .file
    .split_once(':')
    .ok_or_else(|| Error::UnknownPointSourceMethod(needle.file.clone()))?;
  if method != LIBRARY_METHOD {
    return Err(Error::UnknownPointSourceMethod(method.to_owned()));
  }

  let prongs = needle.parameter(PRONG_LOCATIONS)?;
  let prongs: Option<&[Point3]> = prongs
    .as_ref()
    .map(|p| expect(PRONG_LOCATIONS, p, "coordinates", ParameterValue::as_coordinates))
    .transpose()?
    .filter(|p| !p.is_empty());

  let mut el = Element::new("pointsources");
  let extrapolated = match prongs {
    Some(prongs) if variant == STRAIGHT_TINES => {
      el.set("system", EXTRAPOLATED);
      Some(prongs)
    }
    _ => {
      el.set("system", variant);
      None
    }
  };

  let extensions = el.sub("extensions");
  if let Some(lengths) = definition.parameter(NEEDLE_EXTENSIONS)? {
    let lengths = expect(NEEDLE_EXTENSIONS, &lengths, "float list", ParameterValue::as_float_list)?;
    for (phase, length) in lengths.iter().enumerate() {
      extensions
        .sub("extension")
        .set("phase", phase.to_string())
        .set("length", length.to_string());
    }
  }

  if let Some(prongs) = extrapolated {
    let points = el.sub("points");
    for (i, [x, y, z]) in prongs.iter().enumerate() {
      points
        .sub("point")
        .set("i", i.to_string())
        .set("x", x.to_string())
        .set("y", y.to_string())
        .set("z", z.to_string());
    }
  }

  Ok(el)
}

fn lesion(definition: &Definition) -> Result<Element> {
  let field = definition
    .parameter(LESION_FIELD)?
    .ok_or_else(|| gssa_core::Error::MissingParameter(LESION_FIELD.to_owned()))?;

  let mut el = Element::new("lesion").with_attr("field", field.to_string());

  for (key, attr) in [
    (LESION_THRESHOLD_UPPER, "threshold_upper"),
    (LESION_THRESHOLD_LOWER, "threshold_lower"),
  ] {
    if let Some(value) = definition.parameter(key)? {
      let threshold = expect(key, &value, "number", ParameterValue::as_f64)?;
      el.set(attr, threshold.to_string());
    }
  }
  Ok(el)
}

/// Narrow a converted parameter to the shape a section needs.
fn expect<'v, T>(
  key: &str,
  value: &'v ParameterValue,
  expected: &'static str,
  view: impl FnOnce(&'v ParameterValue) -> Option<T>,
) -> Result<T> {
  view(value).ok_or_else(|| {
    gssa_core::Error::ParameterTypeMismatch {
      key: key.to_owned(),
      expected,
      found: value.parameter_type(),
    }
    .into()
  })
}
