//! Error type for the pipeline driver.

use std::path::{Path, PathBuf};

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A source directory could not be walked.
  #[error("cannot discover files under {}: {source}", path.display())]
  Discovery {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A file could not be read or decoded.
  #[error("{}: {source}", path.display())]
  MalformedInput {
    path:   PathBuf,
    #[source]
    source: sparkify_json::Error,
  },

  /// The store rejected a file's batch, or could not be reached.
  #[error("{}: {source}", path.display())]
  Store {
    path:   PathBuf,
    fatal:  bool,
    #[source]
    source: BoxError,
  },
}

impl Error {
  pub fn path(&self) -> &Path {
    match self {
      Error::Discovery { path, .. }
      | Error::MalformedInput { path, .. }
      | Error::Store { path, .. } => path,
    }
  }

  /// Errors that stop the run whatever the failure policy says.
  pub fn is_run_fatal(&self) -> bool {
    match self {
      Error::Discovery { .. } => true,
      Error::MalformedInput { .. } => false,
      Error::Store { fatal, .. } => *fatal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
