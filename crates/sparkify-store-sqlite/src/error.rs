//! Error type for `sparkify-store-sqlite`.

use rusqlite::ErrorCode;
use sparkify_core::store::FailureScope;
use thiserror::Error;

use crate::loader::LoadFailure;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A table's batch was rejected; the enclosing transaction was rolled back.
  #[error(transparent)]
  LoadFailure(#[from] LoadFailure),
}

impl FailureScope for Error {
  fn is_run_fatal(&self) -> bool {
    match self {
      Error::Database(tokio_rusqlite::Error::ConnectionClosed)
      | Error::Database(tokio_rusqlite::Error::Close(_)) => true,
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => matches!(
        e.sqlite_error_code(),
        Some(
          ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
        )
      ),
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
