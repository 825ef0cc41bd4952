//! Source file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Every regular `*.json` file under `root`, recursively, as absolute paths
/// in lexical order.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
  let fail = |source: std::io::Error| Error::Discovery { path: root.to_path_buf(), source };

  let mut files = Vec::new();
  for entry in WalkDir::new(root).follow_links(true) {
    let entry = entry.map_err(|e| fail(e.into()))?;
    let is_json = entry
      .path()
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if entry.file_type().is_file() && is_json {
      files.push(std::path::absolute(entry.path()).map_err(fail)?);
    }
  }

  files.sort();
  Ok(files)
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn finds_json_files_recursively() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("A/B");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("b.json"), "{}").unwrap();
    fs::write(dir.path().join("a.json"), "{}").unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();
    fs::create_dir(dir.path().join("dir.json")).unwrap();

    let files = discover(dir.path()).unwrap();

    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.is_absolute()));
    assert!(files[0].ends_with("A/B/b.json"));
    assert!(files[1].ends_with("a.json"));
  }

  #[test]
  fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::Discovery { .. }));
    assert!(err.is_run_fatal());
  }
}
