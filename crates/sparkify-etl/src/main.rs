//! `sparkify-etl` — one-shot load of song catalog and session log files into
//! the Sparkify warehouse.
//!
//! # Usage
//!
//! ```text
//! sparkify-etl --database sparkify.db --song-data data/song_data --log-data data/log_data
//! sparkify-etl --config sparkify.toml --on-error skip
//! ```
//!
//! Exits non-zero if any file failed to load.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use sparkify_etl::{EtlConfig, FailurePolicy, Pipeline};
use sparkify_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Load Sparkify JSON data into the warehouse")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "sparkify.toml")]
  config: PathBuf,

  /// SQLite database file to load into.
  #[arg(long)]
  database: Option<PathBuf>,

  /// Root directory of the song catalog files.
  #[arg(long)]
  song_data: Option<PathBuf>,

  /// Root directory of the session log files.
  #[arg(long)]
  log_data: Option<PathBuf>,

  /// What to do after a file fails to load.
  #[arg(long, value_enum)]
  on_error: Option<FailurePolicy>,
}

impl Cli {
  /// Flags override the file and environment.
  fn apply(self, config: &mut EtlConfig) {
    if let Some(path) = self.database {
      config.database_path = path;
    }
    if let Some(dir) = self.song_data {
      config.song_data = dir;
    }
    if let Some(dir) = self.log_data {
      config.log_data = dir;
    }
    if let Some(policy) = self.on_error {
      config.on_error = policy;
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut config = EtlConfig::load(&cli.config)
    .with_context(|| format!("failed to read configuration from {:?}", cli.config))?;
  cli.apply(&mut config);

  let store = SqliteStore::open(&config.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.database_path))?;

  let report = Pipeline::new(&store, &config).run().await;

  let counts = store.table_counts().await.context("failed to count rows")?;
  tracing::info!(
    songs = counts.songs,
    artists = counts.artists,
    users = counts.users,
    time = counts.time,
    songplays = counts.songplays,
    "warehouse totals"
  );

  store.close().await.context("failed to close store")?;

  if !report.is_success() {
    for failure in &report.failures {
      tracing::error!(path = %failure.path.display(), error = %failure.error, "unrecovered failure");
    }
    anyhow::bail!(
      "{} file(s) failed{}",
      report.failures.len(),
      if report.halted { "; run halted" } else { "" }
    );
  }

  Ok(())
}
