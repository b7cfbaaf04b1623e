//! Error type for `songplay-parquet`.

use std::path::PathBuf;

use songplay_core::table::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to {op} {path}")]
  Io {
    op:     &'static str,
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("arrow encoding failed")]
  Arrow(#[from] arrow::error::ArrowError),

  #[error("parquet write failed")]
  Parquet(#[from] parquet::errors::ParquetError),

  #[error("background write task failed")]
  Join(#[from] tokio::task::JoinError),

  /// Commit was requested before every table had been written.
  #[error("table {0} was not written")]
  MissingTable(Table),

  /// The sink was already committed or aborted.
  #[error("sink is closed")]
  Closed,
}

impl Error {
  pub(crate) fn io(
    op: &'static str,
    path: impl Into<PathBuf>,
  ) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { op, path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
