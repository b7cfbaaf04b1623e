//! The `TableSink` trait and its write report.
//!
//! The trait is implemented by output backends (e.g. `songplay-parquet`).
//! The pipeline depends on this abstraction, not on any concrete format.

use std::future::Future;

use crate::table::{ArtistDim, SongDim, SongplayFact, Table, TimeDim, UserDim};

/// What a sink wrote for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
  pub table:      Table,
  pub rows:       usize,
  /// Number of partition directories written (1 for unpartitioned tables).
  pub partitions: usize,
  pub files:      usize,
}

/// Abstraction over a destination for the five star-schema tables.
///
/// A run writes every table once and then either commits or aborts. Nothing
/// written before [`TableSink::commit`] may be visible to readers, so a
/// failed run never publishes a partial schema.
///
/// All methods return `Send` futures so independent tables can be written
/// concurrently on a multi-threaded runtime.
pub trait TableSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn write_songs(
    &self,
    rows: Vec<SongDim>,
  ) -> impl Future<Output = Result<TableReport, Self::Error>> + Send + '_;

  fn write_artists(
    &self,
    rows: Vec<ArtistDim>,
  ) -> impl Future<Output = Result<TableReport, Self::Error>> + Send + '_;

  fn write_users(
    &self,
    rows: Vec<UserDim>,
  ) -> impl Future<Output = Result<TableReport, Self::Error>> + Send + '_;

  fn write_time(
    &self,
    rows: Vec<TimeDim>,
  ) -> impl Future<Output = Result<TableReport, Self::Error>> + Send + '_;

  fn write_songplays(
    &self,
    rows: Vec<SongplayFact>,
  ) -> impl Future<Output = Result<TableReport, Self::Error>> + Send + '_;

  /// Atomically publish everything written so far, replacing any previously
  /// published tables.
  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Discard everything written so far. Previously published tables are left
  /// untouched.
  fn abort(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
