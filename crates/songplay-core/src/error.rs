//! Error types for `songplay-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{record} record is missing required field `{field}`")]
  MissingField {
    record: &'static str,
    field:  &'static str,
  },

  #[error("invalid value for `{field}`: {value:?}")]
  InvalidValue { field: &'static str, value: String },

  #[error("event timestamp out of range: {0} ms")]
  InvalidTimestamp(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
