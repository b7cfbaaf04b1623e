//! Record reader for the songplay transform.
//!
//! Finds catalog and event-log files below an input root and decodes them
//! into [`songplay_core`] record types. Pure synchronous; files are decoded
//! in parallel on the rayon pool with file order preserved.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use songplay_records::{Layout, read_catalog, read_events};
//!
//! let root = Path::new("data");
//! let catalog = read_catalog(root, &Layout::catalog_default()).unwrap();
//! let events = read_events(root, &Layout::events_default()).unwrap();
//! println!("{} songs, {} events", catalog.len(), events.len());
//! ```

mod discover;
pub mod error;
mod parse;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use songplay_core::record::{CatalogRecord, EventRecord};

pub use discover::{Layout, discover};
pub use error::{Error, Result};

// ─── Public API ──────────────────────────────────────────────────────────────

/// Decode the catalog objects contained in `input`.
///
/// `origin` only labels error messages.
pub fn parse_catalog(input: &str, origin: &Path) -> Result<Vec<CatalogRecord>> {
  parse::parse_catalog(input, origin)
}

/// Decode the JSON-lines event log contained in `input`.
pub fn parse_events(input: &str, origin: &Path) -> Result<Vec<EventRecord>> {
  parse::parse_events(input, origin)
}

/// Read every catalog record under `root` according to `layout`.
///
/// The first malformed record fails the whole read.
pub fn read_catalog(root: &Path, layout: &Layout) -> Result<Vec<CatalogRecord>> {
  let files = discover(root, layout)?;
  let records = read_files(&files, parse::parse_catalog)?;
  tracing::info!(
    files = files.len(),
    records = records.len(),
    "read song catalog"
  );
  Ok(records)
}

/// Read every event record under `root` according to `layout`.
pub fn read_events(root: &Path, layout: &Layout) -> Result<Vec<EventRecord>> {
  let files = discover(root, layout)?;
  let records = read_files(&files, parse::parse_events)?;
  tracing::info!(
    files = files.len(),
    records = records.len(),
    "read event log"
  );
  Ok(records)
}

fn read_files<T, F>(files: &[PathBuf], parse: F) -> Result<Vec<T>>
where
  T: Send,
  F: Fn(&str, &Path) -> Result<Vec<T>> + Sync,
{
  let per_file: Vec<Vec<T>> = files
    .par_iter()
    .map(|path| {
      let input = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
      })?;
      parse(&input, path)
    })
    .collect::<Result<_>>()?;

  Ok(per_file.into_iter().flatten().collect())
}
