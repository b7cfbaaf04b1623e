//! Encoding rows into Arrow record batches.
//!
//! Timestamps are stored as UTC microseconds. Enum columns (`level`) are
//! stored as their lowercase names. Partition columns are skipped; they are
//! encoded in the directory path instead.

use std::sync::Arc;

use arrow::{
  array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, StringArray,
    TimestampMicrosecondArray, UInt64Array,
  },
  datatypes::SchemaRef,
  record_batch::RecordBatch,
};
use songplay_core::table::{
  ArtistDim, Row, SongDim, SongplayFact, TimeDim, UserDim,
};

use crate::{Result, schema};

/// A row type that can be written as Parquet.
pub trait Encode: Row {
  fn schema() -> SchemaRef;

  fn columns(rows: &[&Self]) -> Vec<ArrayRef>;

  fn encode(rows: &[&Self]) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(Self::schema(), Self::columns(rows))?)
  }
}

// ─── Column helpers ──────────────────────────────────────────────────────────

fn strings<'a, T: 'a>(
  rows: &[&'a T],
  f: impl Fn(&'a T) -> &'a str,
) -> ArrayRef {
  Arc::new(StringArray::from(
    rows.iter().map(|&r| f(r)).collect::<Vec<_>>(),
  ))
}

fn opt_strings<'a, T: 'a>(
  rows: &[&'a T],
  f: impl Fn(&'a T) -> Option<&'a str>,
) -> ArrayRef {
  Arc::new(StringArray::from(
    rows.iter().map(|&r| f(r)).collect::<Vec<_>>(),
  ))
}

fn floats<T>(rows: &[&T], f: impl Fn(&T) -> f64) -> ArrayRef {
  Arc::new(Float64Array::from(rows.iter().map(|r| f(r)).collect::<Vec<_>>()))
}

fn opt_floats<T>(rows: &[&T], f: impl Fn(&T) -> Option<f64>) -> ArrayRef {
  Arc::new(Float64Array::from(rows.iter().map(|r| f(r)).collect::<Vec<_>>()))
}

fn small_ints<T>(rows: &[&T], f: impl Fn(&T) -> u32) -> ArrayRef {
  // Calendar fields are all well below i32::MAX.
  Arc::new(Int32Array::from(
    rows.iter().map(|r| f(r) as i32).collect::<Vec<_>>(),
  ))
}

fn micros<T>(
  rows: &[&T],
  f: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> ArrayRef {
  Arc::new(
    TimestampMicrosecondArray::from(
      rows.iter().map(|r| f(r).timestamp_micros()).collect::<Vec<_>>(),
    )
    .with_timezone("UTC"),
  )
}

// ─── Tables ──────────────────────────────────────────────────────────────────

impl Encode for SongDim {
  fn schema() -> SchemaRef { schema::SONGS.clone() }

  fn columns(rows: &[&Self]) -> Vec<ArrayRef> {
    vec![
      strings(rows, |r| r.song_id.as_str()),
      floats(rows, |r| r.duration),
    ]
  }
}

impl Encode for ArtistDim {
  fn schema() -> SchemaRef { schema::ARTISTS.clone() }

  fn columns(rows: &[&Self]) -> Vec<ArrayRef> {
    vec![
      strings(rows, |r| r.artist_id.as_str()),
      strings(rows, |r| r.name.as_str()),
      opt_strings(rows, |r| r.location.as_deref()),
      opt_floats(rows, |r| r.latitude),
      opt_floats(rows, |r| r.longitude),
    ]
  }
}

impl Encode for UserDim {
  fn schema() -> SchemaRef { schema::USERS.clone() }

  fn columns(rows: &[&Self]) -> Vec<ArrayRef> {
    vec![
      strings(rows, |r| r.user_id.as_str()),
      opt_strings(rows, |r| r.first_name.as_deref()),
      opt_strings(rows, |r| r.last_name.as_deref()),
      opt_strings(rows, |r| r.gender.as_deref()),
      strings(rows, |r| r.level.as_ref()),
    ]
  }
}

impl Encode for TimeDim {
  fn schema() -> SchemaRef { schema::TIME.clone() }

  fn columns(rows: &[&Self]) -> Vec<ArrayRef> {
    vec![
      micros(rows, |r| r.timestamp),
      small_ints(rows, |r| r.hour),
      small_ints(rows, |r| r.day),
      small_ints(rows, |r| r.week),
      small_ints(rows, |r| r.weekday),
    ]
  }
}

impl Encode for SongplayFact {
  fn schema() -> SchemaRef { schema::SONGPLAYS.clone() }

  fn columns(rows: &[&Self]) -> Vec<ArrayRef> {
    vec![
      Arc::new(UInt64Array::from(
        rows.iter().map(|r| r.songplay_id.get()).collect::<Vec<_>>(),
      )) as ArrayRef,
      micros(rows, |r| r.start_time),
      strings(rows, |r| r.user_id.as_str()),
      strings(rows, |r| r.level.as_ref()),
      opt_strings(rows, |r| r.song_id.as_deref()),
      opt_strings(rows, |r| r.artist_id.as_deref()),
      Arc::new(Int64Array::from(
        rows.iter().map(|r| r.session_id).collect::<Vec<_>>(),
      )),
      opt_strings(rows, |r| r.location.as_deref()),
      opt_strings(rows, |r| r.user_agent.as_deref()),
    ]
  }
}
