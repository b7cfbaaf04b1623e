//! Error type for `songplay-transform`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] songplay_core::Error),

  #[error("invalid transform options: {0}")]
  Options(String),

  /// More partitions or rows per partition than a songplay id can encode.
  #[error("songplay id space exhausted: {0}")]
  IdSpace(String),

  #[error("transform task failed")]
  Join(#[from] tokio::task::JoinError),

  #[error("sink failed")]
  Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn sink<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Sink(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
