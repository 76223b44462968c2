//! Error types for page composition.

use std::path::PathBuf;

/// Errors produced while composing the result tree.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Filesystem error on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Frontmatter could not be serialized.
    #[error("Failed to serialize frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),
}

impl ComposeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
