//! Error types for bucket loading.

use std::path::PathBuf;

/// Error while loading extractor buckets.
#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    /// Bucket file could not be read.
    #[error("failed to read bucket {}: {source}", path.display())]
    Io {
        /// Path of the bucket file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Bucket file is not valid JSON or has the wrong shape.
    #[error("malformed bucket {}: {source}", path.display())]
    Json {
        /// Path of the bucket file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A key that must be numeric is not.
    #[error("bucket {bucket}: key {key:?} is not a valid space id")]
    InvalidSpaceId {
        /// Bucket name.
        bucket: &'static str,
        /// Offending key.
        key: String,
    },
}
