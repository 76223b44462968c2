//! HTML serializer feeding the rendering engine.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use crate::document::{Document, NodeId, NodeKind};

/// HTML void elements, always written self-closing.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serializes a [`Document`] to an HTML fragment.
pub struct HtmlSerializer;

impl HtmlSerializer {
    /// Create a new serializer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Serialize the children of the root element.
    ///
    /// No whitespace is added. Empty storage-format elements (`ac:*`, `ri:*`)
    /// and void elements are self-closing; other elements always get an
    /// explicit end tag so HTML readers do not misparse them.
    #[must_use]
    pub fn serialize(&self, doc: &Document) -> String {
        let mut out = String::with_capacity(4096);
        for &child in doc.children(doc.root()) {
            serialize_node(doc, child, &mut out);
        }
        out
    }

    /// Serialize a single subtree, including its own tags.
    #[must_use]
    pub fn serialize_node(&self, doc: &Document, id: NodeId) -> String {
        let mut out = String::new();
        serialize_node(doc, id, &mut out);
        out
    }
}

impl Default for HtmlSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_node(doc: &Document, id: NodeId, out: &mut String) {
    let (tag, attrs) = match doc.kind(id) {
        NodeKind::Text(text) => {
            escape_into(text, false, out);
            return;
        }
        NodeKind::Element { tag, attrs } => (tag, attrs),
    };

    out.push('<');
    out.push_str(tag);
    for (key, value) in attrs.iter() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }

    let children = doc.children(id);
    if children.is_empty() && self_closing(tag) {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for &child in children {
        serialize_node(doc, child, out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn self_closing(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag) || tag.contains(':')
}

fn escape_into(text: &str, escape_quotes: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if escape_quotes => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Attributes;
    use crate::parser::StorageParser;
    use pretty_assertions::assert_eq;

    fn roundtrip(body: &str) -> String {
        let doc = StorageParser::new().parse(body).unwrap();
        HtmlSerializer::new().serialize(&doc)
    }

    #[test]
    fn test_serialize_nested() {
        assert_eq!(
            roundtrip("<p><strong>Bold</strong> text</p>"),
            "<p><strong>Bold</strong> text</p>"
        );
    }

    #[test]
    fn test_void_elements_self_close() {
        assert_eq!(roundtrip("<p>a<br/>b</p><hr/>"), "<p>a<br />b</p><hr />");
    }

    #[test]
    fn test_empty_html_element_gets_end_tag() {
        assert_eq!(roundtrip("<p/><td/>"), "<p></p><td></td>");
    }

    #[test]
    fn test_empty_storage_element_self_closes() {
        assert_eq!(
            roundtrip(r#"<ri:page ri:content-title="A &amp; B"/>"#),
            r#"<ri:page ri:content-title="A &amp; B" />"#
        );
    }

    #[test]
    fn test_escape_text_and_attributes() {
        let mut doc = Document::new();
        let attrs: Attributes = [("title", "say \"hi\"")].into_iter().collect();
        let p = doc.create_element("p", attrs);
        let text = doc.create_text("a < b & c");
        doc.append_child(doc.root(), p);
        doc.append_child(p, text);

        assert_eq!(
            HtmlSerializer::new().serialize(&doc),
            r#"<p title="say &quot;hi&quot;">a &lt; b &amp; c</p>"#
        );
    }

    #[test]
    fn test_serialize_single_node() {
        let doc = StorageParser::new().parse("<div><em>x</em></div>").unwrap();
        let div = doc.children(doc.root())[0];
        let em = doc.children(div)[0];
        assert_eq!(HtmlSerializer::new().serialize_node(&doc, em), "<em>x</em>");
    }
}
