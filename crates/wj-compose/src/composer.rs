//! Wiki.js result tree: current pages, revision history and uploads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use wj_config::Config;
use wj_lookup::{DataBuckets, RevisionDescriptor, RevisionMetadata, content_id, iso_date};

use crate::assets::AssetCopier;
use crate::error::ComposeError;
use crate::frontmatter::Frontmatter;
use crate::paths::{history_path, output_path};

/// Counters for one composition run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ComposeReport {
    /// Current pages written.
    pub pages: usize,
    /// History files written.
    pub history: usize,
    /// Pages or revisions skipped (missing text, write failure).
    pub skipped: usize,
    /// Assets copied.
    pub assets: usize,
    /// Asset filename collisions.
    pub collisions: usize,
}

/// Writes rendered pages with frontmatter into the result tree.
pub struct PageComposer<'a> {
    buckets: &'a DataBuckets,
    categories: &'a [String],
    converted_dir: PathBuf,
    pages_dir: PathBuf,
    uploads_source: PathBuf,
    uploads_dir: PathBuf,
    copier: AssetCopier,
}

impl<'a> PageComposer<'a> {
    /// Create a composer for `buckets` laid out according to `config`.
    #[must_use]
    pub fn new(buckets: &'a DataBuckets, config: &'a Config) -> Self {
        let workspace = &config.workspace_resolved;
        Self {
            buckets,
            categories: &config.compose.categories,
            converted_dir: workspace.converted_dir(),
            pages_dir: workspace.pages_dir(),
            uploads_source: config.uploads_source_dir(),
            uploads_dir: workspace.uploads_dir(),
            copier: AssetCopier::new(config.uploads_resolved.on_collision),
        }
    }

    /// Copy uploads, then export current pages and their history.
    pub fn compose(&self) -> Result<ComposeReport, ComposeError> {
        fs::create_dir_all(&self.pages_dir).map_err(|e| ComposeError::io(&self.pages_dir, e))?;

        let mut report = ComposeReport::default();
        self.copy_uploads(&mut report)?;
        self.export_current(&mut report);
        self.export_history(&mut report);

        tracing::info!(
            pages = report.pages,
            history = report.history,
            skipped = report.skipped,
            assets = report.assets,
            collisions = report.collisions,
            "Composed result tree in {}",
            self.pages_dir.display()
        );
        Ok(report)
    }

    /// Copy attachment binaries into the flat uploads directory.
    pub fn copy_uploads(&self, report: &mut ComposeReport) -> Result<(), ComposeError> {
        let assets = self
            .copier
            .copy_tree(&self.uploads_source, &self.uploads_dir)?;
        report.assets += assets.copied;
        report.collisions += assets.collisions;
        Ok(())
    }

    /// Write every page's current revision.
    ///
    /// The text comes from the body named by the first revision id. Pages
    /// whose text is missing are skipped with a warning.
    pub fn export_current(&self, report: &mut ComposeReport) {
        for (title, revision_ids) in self.buckets.title_revisions() {
            let Some(first) = revision_ids.first() else {
                continue;
            };
            let Some(body_id) = content_id(first) else {
                tracing::warn!(title = %title, "Revision id {first:?} has no content id, skipping");
                report.skipped += 1;
                continue;
            };
            let Some(body) = self.read_converted(title, body_id) else {
                report.skipped += 1;
                continue;
            };

            let frontmatter = Frontmatter {
                author: self
                    .buckets
                    .history_for(title)
                    .and_then(|revisions| current_revision(title, revisions))
                    .and_then(|rev| rev.author.clone())
                    .filter(|author| !author.is_empty()),
                date: RevisionMetadata::parse(first).map(|meta| meta.iso_date()),
                ..Frontmatter::for_title(title, self.categories)
            };

            let path = self.pages_dir.join(output_path(title));
            match write_page(&path, &frontmatter, &body) {
                Ok(()) => {
                    tracing::debug!(title = %title, "Wrote {}", path.display());
                    report.pages += 1;
                }
                Err(e) => {
                    tracing::warn!(title = %title, "Failed to write page: {e}");
                    report.skipped += 1;
                }
            }
        }
    }

    /// Write every non-current revision of pages with more than one
    /// recorded revision.
    pub fn export_history(&self, report: &mut ComposeReport) {
        for (title, revisions) in self.buckets.revision_history() {
            if revisions.len() < 2 {
                continue;
            }
            let current = current_revision(title, revisions).map(|rev| rev.number);

            for revision in revisions.iter().filter(|rev| Some(rev.number) != current) {
                let Some(body_id) = revision.primary_body_id() else {
                    tracing::warn!(
                        title = %title,
                        revision = revision.number,
                        "Revision has no body id, skipping"
                    );
                    report.skipped += 1;
                    continue;
                };
                let Some(body) = self.read_converted(title, body_id) else {
                    report.skipped += 1;
                    continue;
                };

                let frontmatter = Frontmatter {
                    author: revision.author.clone().filter(|author| !author.is_empty()),
                    date: iso_date(&revision.timestamp),
                    revision: Some(revision.number),
                    version: Some(revision.version.clone()).filter(|v| !v.is_empty()),
                    ..Frontmatter::for_title(title, self.categories)
                };

                let path = self.pages_dir.join(history_path(title, revision.number));
                match write_page(&path, &frontmatter, &body) {
                    Ok(()) => {
                        tracing::debug!(title = %title, "Wrote {}", path.display());
                        report.history += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            title = %title,
                            revision = revision.number,
                            "Failed to write history file: {e}"
                        );
                        report.skipped += 1;
                    }
                }
            }
        }
    }

    fn read_converted(&self, title: &str, body_id: &str) -> Option<String> {
        let path = self.converted_dir.join(format!("{body_id}.md"));
        match fs::read_to_string(&path) {
            Ok(body) => Some(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(title = %title, "Rendered text not found: {}", path.display());
                None
            }
            Err(e) => {
                tracing::warn!(title = %title, "Failed to read {}: {e}", path.display());
                None
            }
        }
    }
}

/// The page's current revision.
///
/// Falls back to the highest revision number when the current flag is
/// missing. Exactly one flagged revision is expected.
fn current_revision<'r>(
    title: &str,
    revisions: &'r [RevisionDescriptor],
) -> Option<&'r RevisionDescriptor> {
    let flagged = revisions.iter().filter(|rev| rev.current).count();
    if flagged != 1 && !revisions.is_empty() {
        tracing::warn!(title = %title, flagged, "Expected exactly one current revision");
    }
    revisions
        .iter()
        .filter(|rev| rev.current)
        .max_by_key(|rev| rev.number)
        .or_else(|| revisions.iter().max_by_key(|rev| rev.number))
}

fn write_page(path: &Path, frontmatter: &Frontmatter, body: &str) -> Result<(), ComposeError> {
    let content = frontmatter.render(body)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ComposeError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| ComposeError::io(path, e))
}
