//! The `WarehouseStore` trait and the per-file batches it persists.
//!
//! The trait is implemented by storage backends (e.g. `sparkify-store-sqlite`).
//! The pipeline driver depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use crate::{
  dimension::{self, ArtistRow, FactRow, SongRow, TimeBucket, UserProfile},
  record::CatalogRecord,
  resolve::CatalogIndex,
};

// ─── Batches ─────────────────────────────────────────────────────────────────

/// Everything derived from one catalog file.
#[derive(Debug, Clone, Default)]
pub struct CatalogBatch {
  pub songs:   Vec<SongRow>,
  pub artists: Vec<ArtistRow>,
}

impl CatalogBatch {
  pub fn from_record(record: &CatalogRecord) -> Self {
    Self {
      songs:   vec![dimension::song_row(record)],
      artists: vec![dimension::artist_row(record)],
    }
  }
}

/// Everything derived from one log file, in load order.
#[derive(Debug, Clone, Default)]
pub struct LogBatch {
  pub time:      Vec<TimeBucket>,
  pub users:     Vec<UserProfile>,
  pub songplays: Vec<FactRow>,
}

// ─── Load reporting ──────────────────────────────────────────────────────────

/// Row counts for one table within one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
  pub table:   &'static str,
  /// Rows handed to the loader.
  pub offered: usize,
  /// Rows the store reports as inserted or updated.
  pub written: usize,
}

/// What a single committed load did, table by table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
  pub tables: Vec<TableLoad>,
}

impl LoadSummary {
  pub fn written(&self, table: &str) -> usize {
    self
      .tables
      .iter()
      .filter(|t| t.table == table)
      .map(|t| t.written)
      .sum()
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Distinguishes errors that only spoil the current file from errors that
/// make continuing pointless.
pub trait FailureScope {
  /// `true` when the store itself is unusable (e.g. the connection is gone).
  fn is_run_fatal(&self) -> bool;
}

/// Abstraction over a warehouse backend.
///
/// Every load runs in its own transaction: either all of a batch's rows are
/// committed or none are.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait WarehouseStore: Send + Sync {
  type Error: std::error::Error + FailureScope + Send + Sync + 'static;

  /// Persist one catalog file's songs and artists. Existing rows win: a song
  /// or artist already present is left untouched.
  fn load_catalog(
    &self,
    batch: CatalogBatch,
  ) -> impl Future<Output = Result<LoadSummary, Self::Error>> + Send + '_;

  /// Persist one log file's time buckets and users (upserted) and its fact
  /// rows (appended).
  fn load_log(
    &self,
    batch: LogBatch,
  ) -> impl Future<Output = Result<LoadSummary, Self::Error>> + Send + '_;

  /// Read the whole catalog into a resolver index.
  fn catalog_index(
    &self,
  ) -> impl Future<Output = Result<CatalogIndex, Self::Error>> + Send + '_;
}
