//! Error-recovering XML parser.
//!
//! # Responsibilities
//! - Turn a terminal payload into an owned element tree
//! - Recover from unclosed or mismatched tags, bad entities and truncated input
//! - Report a `ParseError` only when no element could be read at all
//!
//! # Design Decisions
//! - Built on quick-xml's pull reader with end-name checks disabled; the
//!   element stack is managed here so recovery rules stay explicit
//! - Namespace prefixes are dropped, lookups use local names
//! - A hard reader error stops the scan but keeps what was already built

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// The payload could not be read as XML even tolerantly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unparseable XML payload: {diagnostic}")]
pub struct ParseError {
    /// Underlying syntax diagnostic.
    pub diagnostic: String,
}

/// A parsed XML element with its concatenated text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First direct child with exactly this name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first direct child with exactly this name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Attribute value, matched by exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Pre-order iterator over every element below this one (self excluded).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .with_checks(false)
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = match attr.unescape_value() {
                    Ok(v) => v.into_owned(),
                    Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                };
                (key, value)
            })
            .collect();
        Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }
}

/// Depth-first, document-order walk over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// A parsed payload.
///
/// Top-level elements hang under a synthetic container so that inputs with
/// several roots (or stray trailing markup) remain searchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    container: Element,
    /// Number of recovery actions taken while parsing.
    pub recovered: usize,
}

impl Document {
    /// The first top-level element.
    pub fn root(&self) -> Option<&Element> {
        self.container.children.first()
    }

    /// Every element in document order.
    pub fn elements(&self) -> Descendants<'_> {
        self.container.descendants()
    }
}

/// Parse a payload into a `Document`, recovering from malformed markup.
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
    let input = input.trim_start_matches('\u{feff}');

    let mut reader = Reader::from_str(input);
    {
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = false;
    }

    let mut stack: Vec<Element> = vec![Element::new("#document")];
    let mut recovered = 0usize;
    let mut diagnostic: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Element::from_start(e)),
            Ok(Event::Empty(ref e)) => {
                let element = Element::from_start(e);
                append_child(&mut stack, element);
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match stack.iter().rposition(|el| el.name == name) {
                    Some(pos) if pos > 0 => {
                        if pos != stack.len() - 1 {
                            recovered += 1;
                        }
                        while stack.len() > pos {
                            close_top(&mut stack);
                        }
                    }
                    _ => {
                        recovered += 1;
                        let closes_top = stack.len() > 1
                            && stack
                                .last()
                                .is_some_and(|top| top.name.eq_ignore_ascii_case(&name));
                        if closes_top {
                            close_top(&mut stack);
                        } else {
                            tracing::trace!(tag = %name, "Ignoring stray end tag");
                        }
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    Err(_) => {
                        recovered += 1;
                        String::from_utf8_lossy(e).into_owned()
                    }
                };
                append_text(&mut stack, &text);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                append_text(&mut stack, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                diagnostic = Some(format!(
                    "{} (at byte {})",
                    e,
                    reader.error_position()
                ));
                recovered += 1;
                break;
            }
            Ok(_) => {}
        }
    }

    if stack.len() > 1 {
        recovered += stack.len() - 1;
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }

    let container = stack.pop().unwrap_or_else(|| Element::new("#document"));
    if container.children.is_empty() {
        return Err(ParseError {
            diagnostic: diagnostic.unwrap_or_else(|| "no XML element found".to_string()),
        });
    }

    if recovered > 0 {
        tracing::debug!(
            recovered,
            diagnostic = diagnostic.as_deref().unwrap_or(""),
            "Recovered from malformed XML"
        );
    }

    Ok(Document {
        container,
        recovered,
    })
}

fn append_child(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.push_str(text);
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        append_child(stack, element);
    }
}
