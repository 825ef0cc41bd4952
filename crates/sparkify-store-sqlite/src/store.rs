//! [`SqliteStore`] — the SQLite implementation of [`WarehouseStore`].

use std::path::Path;

use sparkify_core::{
  resolve::{CatalogEntry, CatalogIndex},
  store::{CatalogBatch, LoadSummary, LogBatch, WarehouseStore},
};

use crate::{
  Error, Result,
  loader::{self, LoadFailure},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Sparkify warehouse backed by a single SQLite file.
///
/// The connection is opened once per run and handed to the pipeline by
/// reference. Cloning is cheap: the inner connection is reference-counted.
/// Dropping the last clone closes the connection; [`SqliteStore::close`] does
/// the same but reports errors.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Row counts of every warehouse table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
  pub songs:     u64,
  pub artists:   u64,
  pub users:     u64,
  pub time:      u64,
  pub songplays: u64,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Close the connection, surfacing any error SQLite reports on shutdown.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  pub async fn table_counts(&self) -> Result<TableCounts> {
    let counts = self
      .conn
      .call(|conn| {
        let count = |table: &str| -> rusqlite::Result<u64> {
          conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
            r.get::<_, i64>(0).map(|n| n as u64)
          })
        };
        Ok(TableCounts {
          songs:     count("songs")?,
          artists:   count("artists")?,
          users:     count("users")?,
          time:      count("time")?,
          songplays: count("songplays")?,
        })
      })
      .await?;
    Ok(counts)
  }

  /// Run `load` inside one transaction. The transaction commits only if
  /// every table in the batch loaded; otherwise it is rolled back and the
  /// store is left exactly as it was.
  async fn in_transaction<B, F>(&self, batch: B, load: F) -> Result<LoadSummary>
  where
    B: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>, &B) -> Result<LoadSummary, LoadFailure>
      + Send
      + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match load(&tx, &batch) {
          Ok(summary) => {
            tx.commit()?;
            Ok(Ok(summary))
          }
          Err(failure) => {
            tx.rollback()?;
            Ok(Err(failure))
          }
        }
      })
      .await?;

    outcome.map_err(|failure| {
      tracing::warn!(
        table = failure.table,
        row = failure.row,
        cause = %failure.cause,
        "batch rejected, transaction rolled back"
      );
      Error::from(failure)
    })
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Run arbitrary SQL against the connection; test inspection only.
  pub(crate) async fn with_conn<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }
}

// ─── WarehouseStore impl ─────────────────────────────────────────────────────

impl WarehouseStore for SqliteStore {
  type Error = Error;

  async fn load_catalog(&self, batch: CatalogBatch) -> Result<LoadSummary> {
    self.in_transaction(batch, loader::load_catalog).await
  }

  async fn load_log(&self, batch: LogBatch) -> Result<LoadSummary> {
    self.in_transaction(batch, loader::load_log).await
  }

  async fn catalog_index(&self) -> Result<CatalogIndex> {
    let entries: Vec<CatalogEntry> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT s.title, a.name, s.duration, s.song_id, s.artist_id
           FROM songs s
           JOIN artists a ON a.artist_id = s.artist_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(CatalogEntry {
              title:       row.get(0)?,
              artist_name: row.get(1)?,
              duration:    row.get(2)?,
              song_id:     row.get(3)?,
              artist_id:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    tracing::debug!(songs = entries.len(), "catalog index loaded");
    Ok(entries.into_iter().collect())
  }
}
