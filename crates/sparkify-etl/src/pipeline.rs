//! The pipeline driver.
//!
//! Walks the catalog directory, then the log directory, one file at a time:
//!
//! ```text
//! Idle → Discovering → ProcessingFile* → Done
//!        per file: parse → extract → (resolve) → load + commit → advance
//! ```
//!
//! Each file is one store transaction. A failed file leaves nothing behind;
//! whether the run continues afterwards is the caller's [`FailurePolicy`].

use std::path::{Path, PathBuf};

use sparkify_core::{
  dimension,
  record::CatalogRecord,
  resolve::{self, CatalogIndex},
  store::{CatalogBatch, FailureScope, LoadSummary, LogBatch, WarehouseStore},
};
use sparkify_json::{LogTable, ParsedFile, RecordShape};
use tracing::{debug, error, info, warn};

use crate::{
  config::{EtlConfig, FailurePolicy},
  discover::discover,
  error::{Error, Result},
};

// ─── Reporting ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
  Idle,
  Discovering,
  ProcessingFile,
  Done,
}

/// Per-directory outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
  pub found:     usize,
  pub processed: usize,
  pub failed:    usize,
}

#[derive(Debug)]
pub struct FileFailure {
  pub path:  PathBuf,
  pub error: Error,
}

#[derive(Debug, Default)]
pub struct RunReport {
  pub catalog:  PhaseReport,
  pub log:      PhaseReport,
  pub failures: Vec<FileFailure>,
  /// The run stopped before visiting every file.
  pub halted:   bool,
}

impl From<Error> for FileFailure {
  fn from(error: Error) -> Self { Self { path: error.path().to_path_buf(), error } }
}

impl RunReport {
  pub fn is_success(&self) -> bool { self.failures.is_empty() }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

pub struct Pipeline<'a, S: WarehouseStore> {
  store:     &'a S,
  song_data: PathBuf,
  log_data:  PathBuf,
  policy:    FailurePolicy,
  phase:     RunPhase,
}

impl<'a, S: WarehouseStore> Pipeline<'a, S> {
  pub fn new(store: &'a S, config: &EtlConfig) -> Self {
    Self {
      store,
      song_data: config.song_data.clone(),
      log_data: config.log_data.clone(),
      policy: config.on_error,
      phase: RunPhase::Idle,
    }
  }

  pub fn phase(&self) -> RunPhase { self.phase }

  fn enter(&mut self, phase: RunPhase) {
    debug!(from = ?self.phase, to = ?phase, "pipeline phase");
    self.phase = phase;
  }

  /// Load the catalog directory fully, then the log directory fully.
  pub async fn run(&mut self) -> RunReport {
    let mut report = RunReport::default();

    let song_data = self.song_data.clone();
    report.catalog = self
      .run_directory(&song_data, RecordShape::Catalog, &mut report.failures, &mut report.halted)
      .await;

    if !report.halted {
      let log_data = self.log_data.clone();
      report.log = self
        .run_directory(&log_data, RecordShape::Log, &mut report.failures, &mut report.halted)
        .await;
    }

    self.enter(RunPhase::Done);
    info!(
      catalog_files = report.catalog.processed,
      log_files = report.log.processed,
      failed = report.failures.len(),
      halted = report.halted,
      "run finished"
    );
    report
  }

  async fn run_directory(
    &mut self,
    dir: &Path,
    shape: RecordShape,
    failures: &mut Vec<FileFailure>,
    halted: &mut bool,
  ) -> PhaseReport {
    let mut phase = PhaseReport::default();

    self.enter(RunPhase::Discovering);
    let files = match discover(dir) {
      Ok(files) => files,
      Err(e) => {
        error!(dir = %dir.display(), error = %e, "discovery failed");
        failures.push(FileFailure::from(e));
        *halted = true;
        return phase;
      }
    };
    phase.found = files.len();
    info!("{} files found in {}", files.len(), dir.display());

    // The catalog is complete by the time logs are read, so one snapshot
    // serves every log file. Catalog files never consult it.
    let index = match shape {
      RecordShape::Catalog => CatalogIndex::new(),
      RecordShape::Log if files.is_empty() => CatalogIndex::new(),
      RecordShape::Log => match self.store.catalog_index().await {
        Ok(index) => {
          info!(songs = index.len(), "catalog index ready");
          index
        }
        Err(e) => {
          let error = store_error(dir, e);
          error!(error = %error, "cannot read catalog");
          failures.push(FileFailure::from(error));
          *halted = true;
          return phase;
        }
      },
    };

    self.enter(RunPhase::ProcessingFile);
    let total = files.len();
    for (i, path) in files.into_iter().enumerate() {
      let outcome = match parse(&path, shape) {
        Ok(ParsedFile::Catalog(record)) => self.load_catalog_file(&path, record).await,
        Ok(ParsedFile::Log(table)) => self.load_log_file(&path, table, &index).await,
        Err(e) => Err(e),
      };

      match outcome {
        Ok(_) => {
          phase.processed += 1;
          info!("{}/{} files processed.", i + 1, total);
        }
        Err(e) => {
          phase.failed += 1;
          error!(path = %path.display(), error = %e, "file failed, rolled back");
          let stop = e.is_run_fatal() || self.policy == FailurePolicy::Halt;
          failures.push(FileFailure::from(e));
          if stop {
            warn!(remaining = total - i - 1, "halting run");
            *halted = true;
            break;
          }
        }
      }
    }

    phase
  }

  async fn load_catalog_file(&self, path: &Path, record: CatalogRecord) -> Result<LoadSummary> {
    let summary = self
      .store
      .load_catalog(CatalogBatch::from_record(&record))
      .await
      .map_err(|e| store_error(path, e))?;

    debug!(
      path = %path.display(),
      song_id = %record.song_id,
      songs = summary.written("songs"),
      artists = summary.written("artists"),
      "catalog file loaded"
    );
    Ok(summary)
  }

  async fn load_log_file(
    &self,
    path: &Path,
    table: LogTable,
    index: &CatalogIndex,
  ) -> Result<LoadSummary> {
    let time = dimension::time_buckets(&table.events);
    let users = dimension::user_profiles(&table.events);
    if !users.excluded.is_empty() {
      debug!(
        path = %path.display(),
        excluded = users.excluded.len(),
        "users with conflicting snapshots withheld"
      );
    }
    let (songplays, stats) = resolve::fact_rows(&table.events, index);

    let summary = self
      .store
      .load_log(LogBatch { time, users: users.profiles, songplays })
      .await
      .map_err(|e| store_error(path, e))?;

    debug!(
      path = %path.display(),
      events = table.events.len(),
      skipped = table.skipped,
      matched = stats.matched,
      missed = stats.missed,
      "log file loaded"
    );
    Ok(summary)
  }
}

fn parse(path: &Path, shape: RecordShape) -> Result<ParsedFile> {
  sparkify_json::parse_file(path, shape)
    .map_err(|source| Error::MalformedInput { path: path.to_path_buf(), source })
}

fn store_error<E>(path: &Path, e: E) -> Error
where
  E: std::error::Error + FailureScope + Send + Sync + 'static,
{
  Error::Store {
    path:   path.to_path_buf(),
    fatal:  e.is_run_fatal(),
    source: Box::new(e),
  }
}
