//! Conversion from event epoch milliseconds to the canonical second-precision
//! timestamp shared by the `time` dimension and the `songplays` fact.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Convert epoch milliseconds to a UTC instant truncated to whole seconds.
///
/// Sub-second precision is discarded (floor division, so pre-epoch values
/// round towards negative infinity).
pub fn from_epoch_millis(ts: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(ts.div_euclid(1000), 0)
    .ok_or(Error::InvalidTimestamp(ts))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncates_to_whole_seconds() {
    let a = from_epoch_millis(1_542_242_000_000).unwrap();
    let b = from_epoch_millis(1_542_242_000_999).unwrap();
    assert_eq!(a.timestamp(), 1_542_242_000);
    assert_eq!(a, b);
    assert_eq!(a.timestamp_subsec_nanos(), 0);
  }

  #[test]
  fn pre_epoch_rounds_down() {
    let t = from_epoch_millis(-1).unwrap();
    assert_eq!(t.timestamp(), -1);
  }

  #[test]
  fn out_of_range_is_rejected() {
    assert!(matches!(
      from_epoch_millis(i64::MAX),
      Err(Error::InvalidTimestamp(i64::MAX))
    ));
  }
}
