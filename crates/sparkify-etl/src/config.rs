//! Run configuration: an optional TOML file layered under `SPARKIFY_*`
//! environment variables. Command-line flags are applied on top by the
//! binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// What the driver does after a file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
  /// Stop at the first failed file.
  #[default]
  Halt,
  /// Record the failure and move on to the next file.
  Skip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
  pub database_path: PathBuf,
  /// Root of the catalog (song) files.
  pub song_data:     PathBuf,
  /// Root of the session log files.
  pub log_data:      PathBuf,
  pub on_error:      FailurePolicy,
}

impl Default for EtlConfig {
  fn default() -> Self {
    Self {
      database_path: PathBuf::from("sparkify.db"),
      song_data:     PathBuf::from("data/song_data"),
      log_data:      PathBuf::from("data/log_data"),
      on_error:      FailurePolicy::default(),
    }
  }
}

impl EtlConfig {
  /// Load from `file` (skipped if absent) and the environment.
  pub fn load(file: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("SPARKIFY"))
      .build()?
      .try_deserialize()
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = EtlConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.database_path, PathBuf::from("sparkify.db"));
    assert_eq!(cfg.song_data, PathBuf::from("data/song_data"));
    assert_eq!(cfg.on_error, FailurePolicy::Halt);
  }

  #[test]
  fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "log_data = \"/srv/logs\"\non_error = \"skip\"").unwrap();

    let cfg = EtlConfig::load(file.path()).unwrap();
    assert_eq!(cfg.log_data, PathBuf::from("/srv/logs"));
    assert_eq!(cfg.on_error, FailurePolicy::Skip);
    assert_eq!(cfg.database_path, PathBuf::from("sparkify.db"));
  }
}
