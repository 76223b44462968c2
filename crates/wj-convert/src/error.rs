//! Error types for conversion.

use std::path::PathBuf;
use std::str::Utf8Error;

/// Error while parsing a storage-format body.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// XML parsing error.
    #[error("XML parse error")]
    Xml(#[from] quick_xml::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error")]
    Utf8(#[from] Utf8Error),

    /// Encoding error during XML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

/// Error from the rendering engine.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Engine process could not be started or fed.
    #[error("failed to run {program}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Engine exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// Program name.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Engine output is not UTF-8.
    #[error("{program} produced invalid UTF-8")]
    Output {
        /// Program name.
        program: String,
        /// Underlying decoding error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Error converting one content body.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Body file could not be read or result could not be written.
    #[error("I/O error on {}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Body is not well-formed.
    #[error("failed to parse body")]
    Parse(#[from] ParseError),

    /// Rendering failed.
    #[error("failed to render body")]
    Render(#[from] RenderError),
}
