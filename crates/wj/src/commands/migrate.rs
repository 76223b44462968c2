//! `wj migrate` command implementation.

use clap::Args;

use super::{WorkspaceArgs, compose, convert, load_buckets};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the migrate command.
#[derive(Args)]
pub(crate) struct MigrateArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Pandoc executable (overrides config).
    #[arg(long)]
    pandoc: Option<String>,
}

impl MigrateArgs {
    /// Execute the migrate command: convert, then compose.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, bucket loading or output setup fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.workspace.load(self.pandoc)?;
        let buckets = load_buckets(&config, &output)?;

        let converted = convert::run(&config, &buckets, &output);
        convert::print_report(&output, &converted);

        let composed = compose::run(&config, &buckets, &output)?;
        compose::print_report(&output, &config, &composed);
        Ok(())
    }
}
