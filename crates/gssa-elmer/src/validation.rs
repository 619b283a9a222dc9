//! Reader for the solver's `validation.xml`.
//!
//! The document is expected to be a flat record:
//!
//! ```xml
//! <validation_struct>
//!   <dice>0.81</dice>
//!   <volume>12.5</volume>
//! </validation_struct>
//! ```
//!
//! Every direct child becomes one key of a JSON object; the value is the
//! child's leading text exactly as written, or `null` when it has none.

use std::path::Path;

use quick_xml::events::Event;
use serde_json::{Map, Value};
use tracing::Span;

use crate::{Error, Result, VALIDATION_FILE};

/// Root tag of a validation document.
pub const VALIDATION_ROOT: &str = "validation_struct";

pub struct ValidationReader {
  span: Span,
}

impl ValidationReader {
  pub fn new(span: Span) -> Self { Self { span } }

  /// Read and flatten `validation.xml` from `working_directory`, returning
  /// the JSON blob to persist.
  pub async fn read(&self, working_directory: &Path) -> Result<String> {
    let path = working_directory.join(VALIDATION_FILE);
    let xml = match tokio::fs::read_to_string(&path).await {
      Ok(xml) => xml,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(Error::ValidationFileMissing(path));
      }
      Err(e) => return Err(e.into()),
    };

    let fields = flatten(&xml)?;
    tracing::debug!(parent: &self.span, fields = fields.len(), "read validation output");
    Ok(serde_json::to_string(&Value::Object(fields))?)
  }
}

/// Flatten the direct children of a `validation_struct` document.
pub fn flatten(xml: &str) -> Result<Map<String, Value>> {
  let mut reader = quick_xml::Reader::from_str(xml);

  let mut fields = Map::new();
  let mut depth = 0usize;
  // Tag and accumulated leading text of the child being read.
  let mut current: Option<(String, Option<String>)> = None;
  let mut in_grandchild = false;

  loop {
    match reader.read_event() {
      Ok(Event::Start(e)) => {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        match depth {
          0 => check_root(&tag)?,
          1 => current = Some((tag, None)),
          _ => in_grandchild = true,
        }
        depth += 1;
      }
      Ok(Event::Empty(e)) => {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        match depth {
          0 => {
            check_root(&tag)?;
            break;
          }
          1 => {
            fields.insert(tag, Value::Null);
          }
          _ => in_grandchild = true,
        }
      }
      Ok(Event::Text(e)) => {
        if depth == 2 && !in_grandchild {
          let text = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
          push_text(&mut current, &text);
        }
      }
      Ok(Event::CData(e)) => {
        if depth == 2 && !in_grandchild {
          push_text(&mut current, &String::from_utf8_lossy(&e));
        }
      }
      Ok(Event::End(_)) => {
        depth = depth.saturating_sub(1);
        if depth == 1 {
          if let Some((tag, text)) = current.take() {
            fields.insert(tag, text.map(Value::String).unwrap_or(Value::Null));
          }
          in_grandchild = false;
        }
        if depth == 0 {
          break;
        }
      }
      Ok(Event::Eof) => {
        if depth == 0 && fields.is_empty() && current.is_none() {
          return Err(Error::ValidationSchemaMismatch {
            expected: VALIDATION_ROOT,
            found:    String::new(),
          });
        }
        break;
      }
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
  }

  Ok(fields)
}

fn check_root(tag: &str) -> Result<()> {
  if tag != VALIDATION_ROOT {
    return Err(Error::ValidationSchemaMismatch {
      expected: VALIDATION_ROOT,
      found:    tag.to_owned(),
    });
  }
  Ok(())
}

fn push_text(current: &mut Option<(String, Option<String>)>, text: &str) {
  if let Some((_, slot)) = current {
    slot.get_or_insert_with(String::new).push_str(text);
  }
}
