//! CLI error types.

use wj_compose::ComposeError;
use wj_config::ConfigError;
use wj_lookup::BucketError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Buckets(#[from] BucketError),

    #[error("{0}")]
    Compose(#[from] ComposeError),
}
