//! Set-based batch loader.
//!
//! Rows for one table are bound into multi-row `INSERT … VALUES (…),(…)`
//! statements; the conflict clause comes from the table's [`TableSpec`].
//! The loader never opens or commits a transaction itself: callers pass the
//! transaction that scopes the whole file.

use rusqlite::{Transaction, types::Value};
use sparkify_core::store::{CatalogBatch, LoadSummary, LogBatch, TableLoad};
use thiserror::Error;

use crate::schema::{self, ConflictPolicy, TableSpec};

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` for the bundled library.
const MAX_BOUND_PARAMS: usize = 32_766;

/// A row that can be bound against a [`TableSpec`]'s column list.
pub trait TableRow {
  fn values(&self) -> Vec<Value>;
}

/// A table's batch was rejected at a specific row.
#[derive(Debug, Error)]
#[error("load into `{table}` failed at row {row}: {cause}")]
pub struct LoadFailure {
  pub table: &'static str,
  /// 0-based position of the offending row within the batch.
  pub row:   usize,
  pub cause: String,
}

// ─── Per-file loads ──────────────────────────────────────────────────────────

/// Artists before songs so the song → artist reference resolves.
pub(crate) fn load_catalog(
  tx: &Transaction<'_>,
  batch: &CatalogBatch,
) -> Result<LoadSummary, LoadFailure> {
  Ok(LoadSummary {
    tables: vec![
      load_rows(tx, &schema::ARTISTS, &batch.artists)?,
      load_rows(tx, &schema::SONGS, &batch.songs)?,
    ],
  })
}

/// Time buckets before facts so the fact → time reference resolves.
pub(crate) fn load_log(
  tx: &Transaction<'_>,
  batch: &LogBatch,
) -> Result<LoadSummary, LoadFailure> {
  Ok(LoadSummary {
    tables: vec![
      load_rows(tx, &schema::TIME, &batch.time)?,
      load_rows(tx, &schema::USERS, &batch.users)?,
      load_rows(tx, &schema::SONGPLAYS, &batch.songplays)?,
    ],
  })
}

// ─── Generic table load ──────────────────────────────────────────────────────

/// Write `rows` into `spec.name`, returning how many rows SQLite reports as
/// inserted or updated.
pub(crate) fn load_rows<R: TableRow>(
  tx: &Transaction<'_>,
  spec: &TableSpec,
  rows: &[R],
) -> Result<TableLoad, LoadFailure> {
  let encoded: Vec<Vec<Value>> = rows.iter().map(TableRow::values).collect();
  check_not_null(spec, &encoded)?;

  let width = spec.columns.len();
  let per_statement = (MAX_BOUND_PARAMS / width).max(1);
  let mut written = 0;

  for (chunk_idx, chunk) in encoded.chunks(per_statement).enumerate() {
    let start = chunk_idx * per_statement;
    match execute_chunk(tx, spec, chunk) {
      Ok(n) => written += n,
      Err(e) => return Err(locate_failure(tx, spec, chunk, start, e)),
    }
  }

  tracing::debug!(table = spec.name, offered = rows.len(), written, "table loaded");

  Ok(TableLoad { table: spec.name, offered: rows.len(), written })
}

fn check_not_null(spec: &TableSpec, rows: &[Vec<Value>]) -> Result<(), LoadFailure> {
  for (row_idx, values) in rows.iter().enumerate() {
    if values.len() != spec.columns.len() {
      return Err(LoadFailure {
        table: spec.name,
        row:   row_idx,
        cause: format!(
          "expected {} values, got {}",
          spec.columns.len(),
          values.len()
        ),
      });
    }
    if let Some(column) = spec
      .columns
      .iter()
      .zip(values)
      .find(|(c, v)| !c.nullable && **v == Value::Null)
      .map(|(c, _)| c)
    {
      return Err(LoadFailure {
        table: spec.name,
        row:   row_idx,
        cause: format!("NULL in non-nullable column `{}`", column.name),
      });
    }
  }
  Ok(())
}

fn execute_chunk(
  tx: &Transaction<'_>,
  spec: &TableSpec,
  chunk: &[Vec<Value>],
) -> rusqlite::Result<usize> {
  let sql = insert_sql(spec, chunk.len());
  let mut stmt = tx.prepare_cached(&sql)?;
  stmt.execute(rusqlite::params_from_iter(chunk.iter().flatten()))
}

/// Replay a rejected chunk one row at a time to find the row SQLite objects
/// to. The transaction is rolled back by the caller either way.
fn locate_failure(
  tx: &Transaction<'_>,
  spec: &TableSpec,
  chunk: &[Vec<Value>],
  start: usize,
  chunk_err: rusqlite::Error,
) -> LoadFailure {
  for (offset, row) in chunk.iter().enumerate() {
    if let Err(e) = execute_chunk(tx, spec, std::slice::from_ref(row)) {
      return LoadFailure { table: spec.name, row: start + offset, cause: e.to_string() };
    }
  }
  LoadFailure { table: spec.name, row: start, cause: chunk_err.to_string() }
}

pub(crate) fn insert_sql(spec: &TableSpec, rows: usize) -> String {
  let columns: Vec<&str> = spec.columns.iter().map(|c| c.name).collect();
  let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
  let values = vec![tuple.as_str(); rows].join(", ");

  let on_conflict = match spec.conflict {
    ConflictPolicy::Append => String::new(),
    ConflictPolicy::Ignore => format!(" ON CONFLICT ({}) DO NOTHING", spec.key.join(", ")),
    ConflictPolicy::Overwrite => {
      let updates: Vec<String> = columns
        .iter()
        .filter(|c| !spec.key.contains(c))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();
      format!(
        " ON CONFLICT ({}) DO UPDATE SET {}",
        spec.key.join(", "),
        updates.join(", ")
      )
    }
  };

  format!(
    "INSERT INTO {} ({}) VALUES {values}{on_conflict}",
    spec.name,
    columns.join(", ")
  )
}
