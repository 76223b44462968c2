//! `wj compose` command implementation.

use clap::Args;
use wj_compose::{ComposeReport, PageComposer};
use wj_config::Config;
use wj_lookup::DataBuckets;

use super::{WorkspaceArgs, load_buckets};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the compose command.
#[derive(Args)]
pub(crate) struct ComposeArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,
}

impl ComposeArgs {
    /// Execute the compose command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, bucket loading or output setup fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.workspace.load(None)?;
        let buckets = load_buckets(&config, &output)?;

        let report = run(&config, &buckets, &output)?;
        print_report(&output, &config, &report);
        Ok(())
    }
}

/// Write pages, history and uploads for `buckets`.
pub(crate) fn run(
    config: &Config,
    buckets: &DataBuckets,
    output: &Output,
) -> Result<ComposeReport, CliError> {
    output.step("Composing Wiki.js pages...");
    Ok(PageComposer::new(buckets, config).compose()?)
}

pub(crate) fn print_report(output: &Output, config: &Config, report: &ComposeReport) {
    let workspace = &config.workspace_resolved;
    output.success(&format!(
        "Created {} pages and {} history files.",
        report.pages, report.history
    ));
    output.info(&format!("  Assets copied: {}", report.assets));
    output.count("Skipped", report.skipped);
    output.count("Asset name collisions", report.collisions);
    output.info(&format!("  Pages: {}", workspace.pages_dir().display()));
    output.info(&format!("  Uploads: {}", workspace.uploads_dir().display()));
}
