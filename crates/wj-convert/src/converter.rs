//! Per-body conversion: parse, rewrite, resolve, render, postprocess.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use wj_lookup::{DataBuckets, KeyLookup, PageTitle, content_id};

use crate::document::Document;
use crate::error::{ConvertError, ParseError};
use crate::links::{LinkResolver, LinkStats, PageContext};
use crate::macros::MacroRewriter;
use crate::parser::StorageParser;
use crate::postprocess::PostprocessPipeline;
use crate::render::RenderEngine;
use crate::serializer::HtmlSerializer;

/// Result of converting one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Final Markdown.
    pub markdown: String,
    /// Number of macros rewritten.
    pub macros: usize,
    /// Link resolution counts.
    pub links: LinkStats,
}

/// Converts storage-format bodies into postprocessed Markdown.
pub struct Converter {
    parser: StorageParser,
    serializer: HtmlSerializer,
    rewriter: MacroRewriter,
    pipeline: PostprocessPipeline,
    renderer: Box<dyn RenderEngine>,
}

impl Converter {
    /// Create a converter with the default postprocess pipeline.
    #[must_use]
    pub fn new(rewriter: MacroRewriter, renderer: Box<dyn RenderEngine>) -> Self {
        Self {
            parser: StorageParser::new(),
            serializer: HtmlSerializer::new(),
            rewriter,
            pipeline: PostprocessPipeline::default(),
            renderer,
        }
    }

    /// Replace the postprocess pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PostprocessPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Parse a body and apply macro and link rewriting.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not well-formed.
    pub fn rewrite(
        &self,
        body: &str,
        lookup: &dyn KeyLookup,
        context: &PageContext,
    ) -> Result<(Document, usize, LinkStats), ParseError> {
        let mut doc = self.parser.parse(body)?;
        let macros = self.rewriter.rewrite_all(&mut doc);
        let links = LinkResolver::new(lookup, context).resolve_all(&mut doc);
        Ok((doc, macros, links))
    }

    /// Convert one body to Markdown.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or rendering fails.
    pub fn convert(
        &self,
        body: &str,
        lookup: &dyn KeyLookup,
        context: &PageContext,
    ) -> Result<Conversion, ConvertError> {
        let (doc, macros, links) = self.rewrite(body, lookup, context)?;
        let html = self.serializer.serialize(&doc);
        let rendered = self.renderer.render(&html)?;
        Ok(Conversion {
            markdown: self.pipeline.run(&rendered),
            macros,
            links,
        })
    }

    /// Convert `source` and write the Markdown to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading, converting or writing fails.
    pub fn convert_file(
        &self,
        source: &Path,
        dest: &Path,
        lookup: &dyn KeyLookup,
        context: &PageContext,
    ) -> Result<Conversion, ConvertError> {
        let body = std::fs::read_to_string(source).map_err(|e| io_error(source, e))?;
        let conversion = self.convert(&body, lookup, context)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        std::fs::write(dest, &conversion.markdown).map_err(|e| io_error(dest, e))?;
        Ok(conversion)
    }

    /// Convert every job, skipping bodies that are missing or fail.
    pub fn convert_all(
        &self,
        jobs: &[ConvertJob],
        lookup: &dyn KeyLookup,
        content_dir: &Path,
        converted_dir: &Path,
    ) -> ConvertReport {
        let mut report = ConvertReport::default();
        for job in jobs {
            let source = job.source_path(content_dir);
            if !source.is_file() {
                tracing::warn!(body = %job.body_id, title = %job.title, "storage body not found");
                report.missing += 1;
                continue;
            }

            let title = PageTitle::parse(&job.title);
            let context = PageContext::new(title.space_id(lookup), title.display());
            match self.convert_file(&source, &job.dest_path(converted_dir), lookup, &context) {
                Ok(conversion) => {
                    tracing::debug!(
                        body = %job.body_id,
                        title = %job.title,
                        macros = conversion.macros,
                        broken_links = conversion.links.broken(),
                        "converted body"
                    );
                    report.converted += 1;
                    report.broken_links += conversion.links.broken();
                }
                Err(e) => {
                    tracing::warn!(body = %job.body_id, title = %job.title, error = %e, "conversion failed");
                    report.failed += 1;
                }
            }
        }
        tracing::info!(
            converted = report.converted,
            missing = report.missing,
            failed = report.failed,
            broken_links = report.broken_links,
            "Conversion finished"
        );
        report
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ConvertError {
    ConvertError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One content body to convert, with the page it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertJob {
    /// Content-body id.
    pub body_id: String,
    /// Target title of the owning page.
    pub title: String,
}

impl ConvertJob {
    /// Storage body path: `<content_dir>/<bodyId>.xml`.
    #[must_use]
    pub fn source_path(&self, content_dir: &Path) -> PathBuf {
        content_dir.join(format!("{}.xml", self.body_id))
    }

    /// Rendered text path: `<converted_dir>/<bodyId>.md`.
    #[must_use]
    pub fn dest_path(&self, converted_dir: &Path) -> PathBuf {
        converted_dir.join(format!("{}.md", self.body_id))
    }

    /// Every body referenced by the buckets, once, in bucket order.
    ///
    /// Covers the content id of each revision id string and the primary
    /// body of each recorded revision.
    #[must_use]
    pub fn collect(buckets: &DataBuckets) -> Vec<ConvertJob> {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        let mut push = |body_id: &str, title: &str| {
            if seen.insert(body_id.to_owned()) {
                jobs.push(ConvertJob {
                    body_id: body_id.to_owned(),
                    title: title.to_owned(),
                });
            }
        };

        for (title, revision_ids) in buckets.title_revisions() {
            for id in revision_ids.iter().filter_map(|r| content_id(r)) {
                push(id, title);
            }
        }
        for (title, revisions) in buckets.revision_history() {
            for id in revisions.iter().filter_map(|r| r.primary_body_id()) {
                push(id, title);
            }
        }
        jobs
    }
}

/// Counts of a batch conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertReport {
    /// Bodies written.
    pub converted: usize,
    /// Bodies without a storage file.
    pub missing: usize,
    /// Bodies that failed to parse, render or write.
    pub failed: usize,
    /// Broken references across all converted bodies.
    pub broken_links: usize,
}
