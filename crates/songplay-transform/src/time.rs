//! Time extractor: play timestamps → `time` dimension.
//!
//! Each play's `ts` (epoch milliseconds) is truncated to whole seconds; every
//! distinct second becomes one row, decomposed in UTC.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Timelike, Utc};
use rayon::prelude::*;
use songplay_core::{record::EventRecord, table::TimeDim};

use crate::Result;

/// Calendar decomposition of `timestamp`.
pub fn decompose(timestamp: DateTime<Utc>) -> TimeDim {
  TimeDim {
    timestamp,
    hour: timestamp.hour(),
    day: timestamp.day(),
    week: timestamp.iso_week().week(),
    month: timestamp.month(),
    year: timestamp.year(),
    weekday: timestamp.weekday().number_from_monday(),
  }
}

/// Build the `time` table, one row per distinct second, sorted ascending.
pub fn extract_time(plays: &[&EventRecord]) -> Result<Vec<TimeDim>> {
  let instants: Vec<DateTime<Utc>> = plays
    .par_iter()
    .map(|e| e.timestamp())
    .collect::<songplay_core::Result<_>>()?;

  let distinct: BTreeSet<DateTime<Utc>> = instants.into_iter().collect();
  Ok(distinct.into_iter().map(decompose).collect())
}
