//! Structured macro expansion.
//!
//! Each recognized `ac:structured-macro` is replaced by portable markup:
//! callouts become styled blockquotes, `details`/`expand` become
//! `<details>`, `toc` is dropped, `jira` becomes a Markdown link and `code`
//! is preserved base64-encoded for [`crate::postprocess::RestoreCode`].
//!
//! Matches are collected into a snapshot before any mutation. A snapshot
//! entry that is no longer attached to the root at its turn is skipped;
//! an inner macro moved along with its parent's body is still attached and
//! is rewritten in its new position.

#![allow(clippy::unused_self)] // Rewrite helpers take &self for API consistency

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::document::{Attributes, Document, NodeId};

/// Element tag of a macro invocation.
pub const MACRO_TAG: &str = "ac:structured-macro";

/// Attribute holding the macro name.
const NAME_ATTR: &str = "ac:name";

const PARAMETER_TAG: &str = "ac:parameter";
const RICH_TEXT_BODY_TAG: &str = "ac:rich-text-body";
const PLAIN_TEXT_BODY_TAG: &str = "ac:plain-text-body";

/// Class marking a preserved code block.
pub const PRESERVED_CODE_CLASS: &str = "PRESERVESYNTAXHIGHLIGHT";

/// Default summary of a `<details>` block.
const DEFAULT_SUMMARY: &str = "Details";

/// Macro names in the order [`MacroRewriter::rewrite_all`] applies them.
pub const REWRITE_ORDER: &[&str] = &[
    "code", "toc", "jira", "info", "note", "tip", "warning", "details", "expand",
];

/// How a macro is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    /// Blockquote with a Wiki.js callout class.
    Callout {
        /// CSS class, e.g. `is-info`.
        class: &'static str,
    },
    /// `<details>` with a summary.
    Details {
        /// Whether the `id` parameter is a summary fallback.
        id_fallback: bool,
    },
    /// Removed without replacement.
    Remove,
    /// Link to an issue tracker.
    Jira,
    /// Code block preserved for postprocessing.
    Code,
}

impl MacroKind {
    /// Catalogue entry for a macro name.
    #[must_use]
    pub fn for_name(name: &str) -> Option<Self> {
        Some(match name {
            "info" => Self::Callout { class: "is-info" },
            "note" => Self::Callout {
                class: "is-warning",
            },
            "tip" => Self::Callout {
                class: "is-success",
            },
            "warning" => Self::Callout { class: "is-danger" },
            "details" => Self::Details { id_fallback: true },
            "expand" => Self::Details { id_fallback: false },
            "toc" => Self::Remove,
            "jira" => Self::Jira,
            "code" => Self::Code,
            _ => return None,
        })
    }
}

/// Recognized macro parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroParam {
    Title,
    Id,
    Key,
    Server,
    ServerId,
    Language,
}

impl MacroParam {
    /// Parse an `ac:name` value.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Self::Title,
            "id" => Self::Id,
            "key" => Self::Key,
            "server" => Self::Server,
            "serverId" => Self::ServerId,
            "language" => Self::Language,
            _ => return None,
        })
    }

    /// Parameter name as written in storage format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Id => "id",
            Self::Key => "key",
            Self::Server => "server",
            Self::ServerId => "serverId",
            Self::Language => "language",
        }
    }
}

impl fmt::Display for MacroParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one invocation. Values are trimmed and never empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MacroParams(Vec<(MacroParam, String)>);

impl MacroParams {
    /// Read the direct `ac:parameter` children of a macro element.
    ///
    /// Unknown names are ignored; the first occurrence of a name wins.
    #[must_use]
    pub fn read(doc: &Document, macro_node: NodeId) -> Self {
        let mut params = Vec::new();
        for param in doc.child_elements_named(macro_node, PARAMETER_TAG) {
            let Some(name) = doc.attr(param, NAME_ATTR).and_then(MacroParam::from_name) else {
                continue;
            };
            let value = doc.text_content(param).trim().to_owned();
            if value.is_empty() || params.iter().any(|(p, _)| *p == name) {
                continue;
            }
            params.push((name, value));
        }
        Self(params)
    }

    /// Value of a parameter.
    #[must_use]
    pub fn get(&self, param: MacroParam) -> Option<&str> {
        self.0
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| v.as_str())
    }
}

/// Expands structured macros in a document.
#[derive(Debug, Clone)]
pub struct MacroRewriter {
    jira_server: String,
}

impl MacroRewriter {
    /// Create a rewriter using `jira_server` when a `jira` macro names none.
    #[must_use]
    pub fn new(jira_server: impl Into<String>) -> Self {
        Self {
            jira_server: jira_server.into(),
        }
    }

    /// Rewrite every invocation of `name`. Returns the number rewritten.
    pub fn rewrite(&self, doc: &mut Document, name: &str) -> usize {
        let Some(kind) = MacroKind::for_name(name) else {
            tracing::debug!(name, "no rewrite rule for macro");
            return 0;
        };

        let snapshot: Vec<NodeId> = doc
            .elements_named(MACRO_TAG)
            .into_iter()
            .filter(|&id| doc.attr(id, NAME_ATTR) == Some(name))
            .collect();

        let mut rewritten = 0;
        for node in snapshot {
            if !doc.is_attached(node) {
                tracing::debug!(name, "skipping detached macro");
                continue;
            }
            let params = MacroParams::read(doc, node);
            let replacement = match kind {
                MacroKind::Callout { class } => self.callout(doc, node, class, &params),
                MacroKind::Details { id_fallback } => {
                    self.details(doc, node, id_fallback, &params)
                }
                MacroKind::Remove => doc.create_text(""),
                MacroKind::Jira => self.jira(doc, &params),
                MacroKind::Code => self.code(doc, node, &params),
            };
            doc.replace(node, replacement);
            rewritten += 1;
        }

        if rewritten > 0 {
            tracing::debug!(name, count = rewritten, "rewrote macros");
        }
        rewritten
    }

    /// Rewrite the whole catalogue in [`REWRITE_ORDER`].
    pub fn rewrite_all(&self, doc: &mut Document) -> usize {
        REWRITE_ORDER
            .iter()
            .map(|name| self.rewrite(doc, name))
            .sum()
    }

    fn callout(
        &self,
        doc: &mut Document,
        node: NodeId,
        class: &str,
        params: &MacroParams,
    ) -> NodeId {
        let blockquote = doc.create_element("blockquote", [("class", class)].into_iter().collect());
        if let Some(title) = params.get(MacroParam::Title) {
            let p = doc.create_element("p", Attributes::new());
            let strong = doc.create_element("strong", Attributes::new());
            let text = doc.create_text(title);
            doc.append_child(strong, text);
            doc.append_child(p, strong);
            doc.append_child(blockquote, p);
        }
        move_bodies(doc, node, blockquote);
        blockquote
    }

    fn details(
        &self,
        doc: &mut Document,
        node: NodeId,
        id_fallback: bool,
        params: &MacroParams,
    ) -> NodeId {
        let summary_text = params
            .get(MacroParam::Title)
            .or_else(|| params.get(MacroParam::Id).filter(|_| id_fallback))
            .unwrap_or(DEFAULT_SUMMARY)
            .to_owned();

        let details = doc.create_element("details", Attributes::new());
        let summary = doc.create_element("summary", Attributes::new());
        let text = doc.create_text(summary_text);
        doc.append_child(summary, text);
        doc.append_child(details, summary);
        move_bodies(doc, node, details);
        details
    }

    fn jira(&self, doc: &mut Document, params: &MacroParams) -> NodeId {
        let text = match params.get(MacroParam::Key) {
            Some(key) => {
                let server = params
                    .get(MacroParam::Server)
                    .unwrap_or(&self.jira_server)
                    .trim_end_matches('/');
                format!("[{key}]({server}/browse/{key})")
            }
            None => "<!-- JIRA macro: no key specified -->".to_owned(),
        };
        doc.create_text(text)
    }

    fn code(&self, doc: &mut Document, node: NodeId, params: &MacroParams) -> NodeId {
        let mut attrs: Attributes = [("class", PRESERVED_CODE_CLASS)].into_iter().collect();
        if let Some(language) = params.get(MacroParam::Language) {
            attrs.set("lang", language);
        }

        let bodies = doc.child_elements_named(node, PLAIN_TEXT_BODY_TAG);
        if bodies.is_empty() {
            attrs.set("data-broken-macro", "no-body");
            return doc.create_element("pre", attrs);
        }

        let code: String = bodies.iter().map(|&b| doc.text_content(b)).collect();
        let pre = doc.create_element("pre", attrs);
        let payload = doc.create_text(BASE64.encode(code));
        doc.append_child(pre, payload);
        pre
    }
}

/// Move the children of every direct `ac:rich-text-body` of `macro_node`
/// into `target`, in document order.
fn move_bodies(doc: &mut Document, macro_node: NodeId, target: NodeId) {
    for body in doc.child_elements_named(macro_node, RICH_TEXT_BODY_TAG) {
        let children = doc.children(body).to_vec();
        for child in children {
            if child == macro_node {
                continue;
            }
            doc.append_child(target, child);
        }
    }
}
