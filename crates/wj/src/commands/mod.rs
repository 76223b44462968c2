//! CLI command implementations.

pub(crate) mod compose;
pub(crate) mod convert;
pub(crate) mod migrate;

use std::path::PathBuf;

use clap::Args;
use wj_config::{CliSettings, Config};
use wj_lookup::DataBuckets;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use compose::ComposeArgs;
pub(crate) use convert::ConvertArgs;
pub(crate) use migrate::MigrateArgs;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct WorkspaceArgs {
    /// Path to configuration file (default: auto-discover wj.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extractor workspace directory (overrides config).
    #[arg(short, long, env = "WJ_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Result directory (overrides config).
    #[arg(long)]
    result_dir: Option<PathBuf>,

    /// Enable verbose output (per-page progress and warnings).
    #[arg(short, long)]
    pub verbose: bool,
}

impl WorkspaceArgs {
    /// Load the configuration with command-line overrides applied.
    pub(crate) fn load(&self, pandoc: Option<String>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            workspace_dir: self.workspace.clone(),
            result_dir: self.result_dir.clone(),
            pandoc,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Load the extractor buckets of the configured workspace.
pub(crate) fn load_buckets(config: &Config, output: &Output) -> Result<DataBuckets, CliError> {
    let dir = config.workspace_resolved.buckets_dir();
    output.info(&format!("Loading buckets from {}...", dir.display()));
    Ok(DataBuckets::load(&dir)?)
}
