//! Output rows of the star schema and their partition keys.
//!
//! Four dimension tables (`songs`, `artists`, `users`, `time`) and one fact
//! table (`songplays`). Foreign keys between them are an analytic convention
//! only; nothing here enforces them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

use crate::record::Level;

// ─── Table identity ──────────────────────────────────────────────────────────

/// The five output tables. The string form is the output directory name.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Table {
  Songs,
  Artists,
  Users,
  Time,
  Songplays,
}

impl Table {
  /// Columns used to partition the table on write, outermost first.
  pub fn partition_columns(self) -> &'static [&'static str] {
    match self {
      Self::Songs => &["year", "artist_id"],
      Self::Artists | Self::Users => &[],
      Self::Time | Self::Songplays => &["year", "month"],
    }
  }
}

// ─── Partition keys ──────────────────────────────────────────────────────────

/// One component of a row's partition key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionValue {
  Int(i64),
  Str(String),
  Null,
}

impl fmt::Display for PartitionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(v) => write!(f, "{v}"),
      Self::Str(v) => f.write_str(v),
      Self::Null => f.write_str("null"),
    }
  }
}

/// A row of one of the output tables.
pub trait Row: Send + Sync + 'static {
  const TABLE: Table;

  /// Partition values in the order of [`Table::partition_columns`]; empty for
  /// unpartitioned tables.
  fn partition_key(&self) -> Vec<PartitionValue>;
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDim {
  pub song_id:   String,
  pub artist_id: String,
  pub year:      i32,
  pub duration:  f64,
}

impl Row for SongDim {
  const TABLE: Table = Table::Songs;

  fn partition_key(&self) -> Vec<PartitionValue> {
    vec![
      PartitionValue::Int(self.year.into()),
      PartitionValue::Str(self.artist_id.clone()),
    ]
  }
}

/// Artist attributes as they appear on a catalog record. Not deduplicated:
/// an artist with several songs appears once per song unless catalog
/// deduplication is switched on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDim {
  pub artist_id: String,
  pub name:      String,
  pub location:  Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}

impl Row for ArtistDim {
  const TABLE: Table = Table::Artists;

  fn partition_key(&self) -> Vec<PartitionValue> { Vec::new() }
}

/// A user's most recently observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDim {
  pub user_id:    String,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub gender:     Option<String>,
  pub level:      Level,
}

impl Row for UserDim {
  const TABLE: Table = Table::Users;

  fn partition_key(&self) -> Vec<PartitionValue> { Vec::new() }
}

/// Calendar decomposition of one distinct play instant (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDim {
  pub timestamp: DateTime<Utc>,
  pub hour:      u32,
  pub day:       u32,
  /// ISO 8601 week number, 1–53.
  pub week:      u32,
  pub month:     u32,
  pub year:      i32,
  /// ISO weekday number, Monday = 1 … Sunday = 7.
  pub weekday:   u32,
}

impl Row for TimeDim {
  const TABLE: Table = Table::Time;

  fn partition_key(&self) -> Vec<PartitionValue> {
    vec![
      PartitionValue::Int(self.year.into()),
      PartitionValue::Int(self.month.into()),
    ]
  }
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// Surrogate key of a songplay: the index of the partition that produced the
/// row in the high 32 bits and the row's position inside that partition in
/// the low 32 bits.
///
/// Unique without a shared counter, and increasing in output order as long as
/// partitions are numbered in input order.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SongplayId(u64);

impl SongplayId {
  pub fn new(partition: u32, sequence: u32) -> Self {
    Self((u64::from(partition) << 32) | u64::from(sequence))
  }

  pub fn partition(self) -> u32 { (self.0 >> 32) as u32 }

  pub fn sequence(self) -> u32 { self.0 as u32 }

  pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for SongplayId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One play. `song_id` and `artist_id` are `None` when the play could not be
/// matched against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongplayFact {
  pub songplay_id: SongplayId,
  /// Equal to the `timestamp` of the matching `time` row.
  pub start_time:  DateTime<Utc>,
  pub user_id:     String,
  pub level:       Level,
  pub song_id:     Option<String>,
  pub artist_id:   Option<String>,
  pub session_id:  i64,
  pub location:    Option<String>,
  pub user_agent:  Option<String>,
  pub year:        i32,
  pub month:       u32,
}

impl Row for SongplayFact {
  const TABLE: Table = Table::Songplays;

  fn partition_key(&self) -> Vec<PartitionValue> {
    vec![
      PartitionValue::Int(self.year.into()),
      PartitionValue::Int(self.month.into()),
    ]
  }
}
