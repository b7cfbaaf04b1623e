//! Hive-style partition directory names.
//!
//! `year=1994/artist_id=AR%2F1`: each partition column becomes one directory
//! level. Characters that are unsafe in paths are percent-escaped with the
//! same set Hive and Spark escape; null and empty values map to the Hive
//! default partition.

use std::path::PathBuf;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use songplay_core::table::PartitionValue;

pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Hive's escaped characters. Non-ASCII bytes are always escaped as UTF-8.
const HIVE: &AsciiSet = &CONTROLS
  .add(b'"')
  .add(b'#')
  .add(b'%')
  .add(b'\'')
  .add(b'*')
  .add(b'/')
  .add(b':')
  .add(b'=')
  .add(b'?')
  .add(b'\\')
  .add(b'{')
  .add(b'[')
  .add(b']')
  .add(b'^');

/// Percent-escape a single path segment.
pub fn escape(value: &str) -> String {
  utf8_percent_encode(value, HIVE).to_string()
}

fn segment(value: &PartitionValue) -> String {
  match value {
    PartitionValue::Int(v) => v.to_string(),
    PartitionValue::Str(s) if s.is_empty() => DEFAULT_PARTITION.to_owned(),
    PartitionValue::Str(s) => escape(s),
    PartitionValue::Null => DEFAULT_PARTITION.to_owned(),
  }
}

/// Relative directory for a partition key, e.g. `year=2018/month=11`.
/// Empty for unpartitioned tables.
pub fn relative_dir(columns: &[&str], key: &[PartitionValue]) -> PathBuf {
  columns
    .iter()
    .zip(key)
    .map(|(column, value)| format!("{}={}", escape(column), segment(value)))
    .collect()
}
