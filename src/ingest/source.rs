//! Sensor readout file
//!
//! The file is re-read in full on every poll; only its final line matters.

use std::path::{Path, PathBuf};

/// Text file the sensor appends readings to
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file and return its last line with surrounding
    /// whitespace stripped, or `None` if the file has no lines.
    pub async fn last_line(&self) -> std::io::Result<Option<String>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(last_line_of(&contents))
    }
}

/// Last line of `contents`, stripped. A trailing newline does not start a new
/// line, but a trailing blank line does (and strips to the empty string).
pub fn last_line_of(contents: &str) -> Option<String> {
    contents.lines().last().map(|line| line.trim().to_string())
}
