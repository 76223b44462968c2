//! `wj convert` command implementation.

use clap::Args;
use wj_config::Config;
use wj_convert::{ConvertJob, ConvertReport, Converter, MacroRewriter, PandocRenderer};
use wj_lookup::DataBuckets;

use super::{WorkspaceArgs, load_buckets};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Pandoc executable (overrides config).
    #[arg(long)]
    pub pandoc: Option<String>,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or bucket loading fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.workspace.load(self.pandoc)?;
        let buckets = load_buckets(&config, &output)?;

        let report = run(&config, &buckets, &output);
        print_report(&output, &report);
        Ok(())
    }
}

/// Convert every body referenced by `buckets`.
pub(crate) fn run(config: &Config, buckets: &DataBuckets, output: &Output) -> ConvertReport {
    let workspace = &config.workspace_resolved;
    let jobs = ConvertJob::collect(buckets);
    output.step(&format!("Converting {} bodies...", jobs.len()));

    let converter = Converter::new(
        MacroRewriter::new(&config.convert.jira_server),
        Box::new(PandocRenderer::new(&config.convert.pandoc)),
    );
    converter.convert_all(
        &jobs,
        buckets.tables(),
        &workspace.content_dir(),
        &workspace.converted_dir(),
    )
}

pub(crate) fn print_report(output: &Output, report: &ConvertReport) {
    output.success(&format!("Converted {} bodies.", report.converted));
    output.count("Missing storage bodies", report.missing);
    output.count("Failed conversions", report.failed);
    output.count("Broken links", report.broken_links);
}
