//! Error types for the sparkify-json parser.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The input is not valid JSON, or a required field is missing, duplicated
  /// or of the wrong type. `line` is 1-based.
  #[error("malformed input at line {line}: {reason}")]
  MalformedInput { line: usize, reason: String },
}

impl Error {
  pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
    Self::MalformedInput { line, reason: reason.into() }
  }

  pub(crate) fn from_json(line_offset: usize, e: &serde_json::Error) -> Self {
    Self::malformed(line_offset + e.line().max(1), e.to_string())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
