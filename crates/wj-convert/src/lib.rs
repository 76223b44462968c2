//! Confluence storage format to Wiki.js Markdown conversion.
//!
//! A body goes through a fixed chain:
//!
//! 1. [`StorageParser`] builds a [`Document`] arena from storage XHTML
//! 2. [`MacroRewriter`] expands structured macros
//! 3. [`LinkResolver`] rewrites page, attachment and user references
//! 4. [`HtmlSerializer`] writes the tree back as HTML
//! 5. a [`RenderEngine`] (usually [`PandocRenderer`]) produces Markdown
//! 6. [`PostprocessPipeline`] cleans rendering artifacts
//!
//! [`Converter`] drives the chain for one body or a batch of bodies.
//!
//! # Example
//!
//! ```
//! use wj_convert::{HtmlSerializer, MacroRewriter, StorageParser};
//!
//! let mut doc = StorageParser::new()
//!     .parse(r#"<ac:structured-macro ac:name="tip"><ac:rich-text-body><p>Hi</p></ac:rich-text-body></ac:structured-macro>"#)
//!     .unwrap();
//! MacroRewriter::new("https://jira.example.com").rewrite(&mut doc, "tip");
//!
//! assert_eq!(
//!     HtmlSerializer::new().serialize(&doc),
//!     r#"<blockquote class="is-success"><p>Hi</p></blockquote>"#
//! );
//! ```

mod converter;
mod document;
mod entities;
mod error;
mod links;
mod macros;
mod parser;
pub mod postprocess;
mod render;
mod serializer;

pub use converter::{Conversion, ConvertJob, ConvertReport, Converter};
pub use document::{Attributes, Document, NodeId, NodeKind};
pub use error::{ConvertError, ParseError, RenderError};
pub use links::{
    KindStats, LinkKind, LinkReference, LinkResolver, LinkStats, PageContext, Resolution,
    normalize_title, title_label, title_to_path,
};
pub use macros::{MacroKind, MacroParam, MacroParams, MacroRewriter, REWRITE_ORDER};
pub use parser::StorageParser;
pub use postprocess::{PostprocessPipeline, Postprocessor};
pub use render::{PandocRenderer, RenderEngine};
pub use serializer::HtmlSerializer;
