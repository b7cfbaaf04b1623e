//! Error types for the record reader.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The bytes at `line` are not a JSON object of the expected shape.
  #[error("{path}:{line}: malformed record")]
  Decode {
    path:   PathBuf,
    line:   usize,
    #[source]
    source: serde_json::Error,
  },

  /// The record decoded but violates the record schema.
  #[error("{path}:{line}: invalid record")]
  Schema {
    path:   PathBuf,
    line:   usize,
    #[source]
    source: songplay_core::Error,
  },

  #[error("failed to read {path}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to list {path}")]
  Walk {
    path:   PathBuf,
    #[source]
    source: walkdir::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
