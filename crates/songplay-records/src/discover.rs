//! Input file discovery.
//!
//! A layout such as `song_data/*/*/*/*.json` is expressed as a directory plus
//! a depth: every `*.json` file exactly `depth` components below the
//! directory matches.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Where one record stream lives below the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  /// Directory relative to the input root (e.g. `song_data`).
  pub dir:   PathBuf,
  /// Number of path components from `dir` to each file, the file included.
  pub depth: usize,
}

impl Layout {
  pub fn new(dir: impl Into<PathBuf>, depth: usize) -> Self {
    Self {
      dir: dir.into(),
      depth,
    }
  }

  /// Catalog files: `song_data/<A>/<B>/<C>/<file>.json`.
  pub fn catalog_default() -> Self { Self::new("song_data", 4) }

  /// Event files: `log_data/<year>/<month>/<file>.json`.
  pub fn events_default() -> Self { Self::new("log_data", 3) }
}

/// List matching files below `root.join(layout.dir)`, sorted by path.
///
/// A missing directory is an error; a directory with no matching files
/// yields an empty list.
pub fn discover(root: &Path, layout: &Layout) -> Result<Vec<PathBuf>> {
  let base = root.join(&layout.dir);
  if !base.is_dir() {
    return Err(Error::Io {
      path:   base,
      source: std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "input directory does not exist",
      ),
    });
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(&base)
    .min_depth(layout.depth)
    .max_depth(layout.depth)
    .sort_by_file_name()
  {
    let entry = entry.map_err(|source| Error::Walk {
      path: base.clone(),
      source,
    })?;
    let is_json = entry
      .path()
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if entry.file_type().is_file() && is_json {
      files.push(entry.into_path());
    }
  }

  files.sort();
  Ok(files)
}
