//! A small owned XML element tree.
//!
//! The compiler builds the solver configuration as a tree so that sections
//! can be attached in any order and inspected in tests; `quick-xml`'s writer
//! API only comes in at serialisation time.

use std::{fmt::Display, io::Cursor, path::Path};

use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
  pub tag:        String,
  pub attributes: Vec<(String, String)>,
  pub text:       Option<String>,
  pub children:   Vec<Element>,
}

impl Element {
  pub fn new(tag: impl Into<String>) -> Self {
    Self { tag: tag.into(), ..Self::default() }
  }

  /// Set an attribute, replacing any previous value.
  pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
    let value = value.into();
    match self.attributes.iter_mut().find(|(k, _)| k == key) {
      Some((_, v)) => *v = value,
      None => self.attributes.push((key.to_owned(), value)),
    }
    self
  }

  pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
    self.set(key, value);
    self
  }

  pub fn with_text(mut self, text: impl Into<String>) -> Self {
    self.text = Some(text.into());
    self
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  /// Append `child` and return a handle to it.
  pub fn push(&mut self, child: Element) -> &mut Element {
    self.children.push(child);
    let last = self.children.len() - 1;
    &mut self.children[last]
  }

  /// Append a new empty child named `tag` and return a handle to it.
  pub fn sub(&mut self, tag: &str) -> &mut Element { self.push(Element::new(tag)) }

  /// First direct child named `tag`.
  pub fn child(&self, tag: &str) -> Option<&Element> {
    self.children.iter().find(|c| c.tag == tag)
  }

  /// All direct children named `tag`.
  pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    self.children.iter().filter(move |c| c.tag == tag)
  }

  /// Serialise with an XML declaration and two-space indentation.
  pub fn to_xml(&self) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
      .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
      .map_err(xml_err)?;
    write_element(&mut writer, self)?;
    Ok(writer.into_inner().into_inner())
  }

  pub fn to_xml_string(&self) -> Result<String> {
    String::from_utf8(self.to_xml()?).map_err(xml_err)
  }

  /// Serialise to `path`, replacing any existing file.
  pub async fn write_to(&self, path: &Path) -> Result<()> {
    let bytes = self.to_xml()?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
  }
}

// ─── XML writer helpers ──────────────────────────────────────────────────────

fn xml_err(e: impl Display) -> Error { Error::Xml(e.to_string()) }

fn write_element(w: &mut Writer<Cursor<Vec<u8>>>, el: &Element) -> Result<()> {
  let mut start = BytesStart::new(el.tag.as_str());
  for (k, v) in &el.attributes {
    start.push_attribute((k.as_str(), v.as_str()));
  }

  let text = el.text.as_deref().filter(|t| !t.is_empty());
  if text.is_none() && el.children.is_empty() {
    return w.write_event(Event::Empty(start)).map_err(xml_err);
  }

  w.write_event(Event::Start(start)).map_err(xml_err)?;
  if let Some(text) = text {
    w.write_event(Event::Text(BytesText::new(text))).map_err(xml_err)?;
  }
  for child in &el.children {
    write_element(w, child)?;
  }
  w.write_event(Event::End(BytesEnd::new(el.tag.as_str())))
    .map_err(xml_err)
}
