//! Storage-format (Confluence XHTML) parser.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::document::{Attributes, Document, NodeId};
use crate::entities::{replace_html_entities, resolve_reference};
use crate::error::ParseError;

/// Namespaces used by storage-format elements.
const NAMESPACES: &[(&str, &str)] = &[
    ("ac", "http://www.atlassian.com/schema/confluence/4/ac/"),
    ("ri", "http://www.atlassian.com/schema/confluence/4/ri/"),
];

/// Parses a storage-format body into a [`Document`].
pub struct StorageParser;

impl StorageParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse a body fragment.
    ///
    /// The fragment is wrapped in a root element declaring the `ac:` and
    /// `ri:` prefixes; the root becomes [`Document::root`]. Comments and
    /// processing instructions are dropped, CDATA becomes text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not well-formed XML.
    pub fn parse(&self, body: &str) -> Result<Document, ParseError> {
        let body = replace_html_entities(body);
        let namespace_decls = NAMESPACES
            .iter()
            .map(|(prefix, uri)| format!(r#"xmlns:{prefix}="{uri}""#))
            .collect::<Vec<_>>()
            .join(" ");
        let wrapped = format!("<root {namespace_decls}>{body}</root>");

        let mut reader = Reader::from_str(&wrapped);
        reader.config_mut().trim_text(false);

        let mut doc = Document::new();
        // Open elements; empty until the wrapper root is seen
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if let Some(&parent) = open.last() {
                        let element = self.element(&reader, &mut doc, &e);
                        doc.append_child(parent, element);
                        open.push(element);
                    } else {
                        open.push(doc.root());
                    }
                }
                Event::Empty(e) => {
                    if let Some(&parent) = open.last() {
                        let element = self.element(&reader, &mut doc, &e);
                        doc.append_child(parent, element);
                    }
                }
                Event::Text(e) => {
                    if let Some(&parent) = open.last() {
                        let text = reader.decoder().decode(&e)?;
                        doc.append_text(parent, &text);
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(&parent) = open.last() {
                        let name = reader.decoder().decode(&e)?;
                        doc.append_text(parent, &resolve_reference(&name));
                    }
                }
                Event::CData(e) => {
                    if let Some(&parent) = open.last() {
                        doc.append_text(parent, &String::from_utf8_lossy(&e));
                    }
                }
                Event::End(_) => {
                    open.pop();
                    if open.is_empty() {
                        break;
                    }
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        Ok(doc)
    }

    fn element(&self, reader: &Reader<&[u8]>, doc: &mut Document, e: &BytesStart) -> NodeId {
        let tag = decode_lossy(reader, e.name().as_ref());
        let mut attrs = Attributes::new();
        for attr in e.attributes().flatten() {
            let key = decode_lossy(reader, attr.key.as_ref());
            if key.starts_with("xmlns") {
                continue;
            }
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                Cow::into_owned,
            );
            attrs.set(key, value);
        }
        doc.create_element(tag, attrs)
    }
}

impl Default for StorageParser {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_lossy(reader: &Reader<&[u8]>, bytes: &[u8]) -> String {
    reader.decoder().decode(bytes).map_or_else(
        |_| String::from_utf8_lossy(bytes).into_owned(),
        Cow::into_owned,
    )
}
