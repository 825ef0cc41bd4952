//! JSON record parser for Sparkify source files.
//!
//! Converts catalog files and session logs into [`sparkify_core`] records.
//! Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use sparkify_json::{ParsedFile, RecordShape, parse_file};
//!
//! match parse_file("data/log_data/2018-11-01-events.json", RecordShape::Log).unwrap() {
//!   ParsedFile::Log(table) => println!("{} plays", table.events.len()),
//!   ParsedFile::Catalog(record) => println!("song {}", record.song_id),
//! }
//! ```

mod catalog;
pub mod error;
mod log;

use std::path::Path;

pub use error::{Error, Result};
pub use log::{LogTable, NEXT_SONG};
use sparkify_core::record::CatalogRecord;

/// Which layout a source file is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
  /// A single JSON object describing one song and its artist.
  Catalog,
  /// Newline-delimited JSON session events.
  Log,
}

/// The decoded contents of one source file.
#[derive(Debug, Clone)]
pub enum ParsedFile {
  Catalog(CatalogRecord),
  Log(LogTable),
}

/// Read and decode the file at `path` according to `shape`.
pub fn parse_file(path: impl AsRef<Path>, shape: RecordShape) -> Result<ParsedFile> {
  match shape {
    RecordShape::Catalog => read_catalog(path).map(ParsedFile::Catalog),
    RecordShape::Log => read_log(path).map(ParsedFile::Log),
  }
}

/// Read and decode a catalog file.
pub fn read_catalog(path: impl AsRef<Path>) -> Result<CatalogRecord> {
  parse_catalog(&read(path.as_ref())?)
}

/// Read and decode a session log file.
pub fn read_log(path: impl AsRef<Path>) -> Result<LogTable> { parse_log(&read(path.as_ref())?) }

fn read(path: &Path) -> Result<String> {
  std::fs::read_to_string(path).map_err(|source| Error::Io {
    path: path.to_path_buf(),
    source,
  })
}

/// Decode a catalog document: exactly one JSON object.
pub fn parse_catalog(input: &str) -> Result<CatalogRecord> { catalog::parse_catalog(input) }

/// Decode a session log, keeping only [`NEXT_SONG`] events.
pub fn parse_log(input: &str) -> Result<LogTable> { log::parse_log(input) }
