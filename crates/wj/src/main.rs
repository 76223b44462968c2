//! WJ CLI - Confluence to Wiki.js migration.
//!
//! Provides commands for:
//! - `convert`: Render storage-format bodies to Markdown
//! - `compose`: Write Wiki.js pages, history and uploads
//! - `migrate`: Convert, then compose

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ComposeArgs, ConvertArgs, MigrateArgs};
use output::Output;

/// WJ - Confluence to Wiki.js migration.
#[derive(Parser)]
#[command(name = "wj", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert storage-format bodies to Markdown.
    Convert(ConvertArgs),
    /// Compose the Wiki.js result tree from converted bodies.
    Compose(ComposeArgs),
    /// Convert and compose in one run.
    Migrate(MigrateArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Convert(args) => args.workspace.verbose,
            Self::Compose(args) => args.workspace.verbose,
            Self::Migrate(args) => args.workspace.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Compose(args) => args.execute(),
        Commands::Migrate(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
