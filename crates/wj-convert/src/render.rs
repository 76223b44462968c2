//! HTML to Markdown rendering engines.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::RenderError;

/// Converts a serialized HTML fragment into Markdown.
///
/// Implementations must be pure: the same input gives the same output.
pub trait RenderEngine {
    /// Render one HTML fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails for this input.
    fn render(&self, html: &str) -> Result<String, RenderError>;
}

/// Renders through an external `pandoc -f html -t gfm` process.
#[derive(Debug, Clone)]
pub struct PandocRenderer {
    program: String,
}

impl PandocRenderer {
    /// Create a renderer running `program` (usually `pandoc`).
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this renderer runs.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for PandocRenderer {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl RenderEngine for PandocRenderer {
    fn render(&self, html: &str) -> Result<String, RenderError> {
        let spawn_err = |source| RenderError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(["-f", "html", "-t", "gfm"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Feed stdin from a separate thread so a full stdout pipe cannot block us
        let output = std::thread::scope(|scope| {
            let stdin = child.stdin.take();
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(html.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            written.and(output)
        })
        .map_err(spawn_err)?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let markdown = String::from_utf8(output.stdout).map_err(|source| RenderError::Output {
            program: self.program.clone(),
            source,
        })?;
        Ok(markdown.trim_end_matches('\n').to_owned())
    }
}
