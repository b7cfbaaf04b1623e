//! Songplay resolver: plays ⟕ catalog → `songplays` fact table.
//!
//! Every play yields exactly one row (left join). A play matches a catalog
//! record when title and artist name are equal and the durations differ by
//! less than the configured tolerance. When several records match, the one
//! with the lowest `song_id` wins.
//!
//! Plays are cut into fixed-size partitions that are resolved in parallel.
//! Each row's [`SongplayId`] combines its partition index with its position
//! inside the partition, so ids are unique without any shared counter.

use std::collections::HashMap;

use chrono::Datelike;
use rayon::prelude::*;
use songplay_core::{
  record::{CatalogRecord, EventRecord},
  table::{SongplayFact, SongplayId},
};
use tracing::debug;

use crate::{Error, Result};

// ─── Catalog index ───────────────────────────────────────────────────────────

/// Outcome of matching one play against the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
  Unmatched,
  Matched(&'a CatalogRecord),
  /// Several records matched; `chosen` has the lowest `song_id`.
  Ambiguous {
    chosen:     &'a CatalogRecord,
    candidates: usize,
  },
}

impl<'a> Resolution<'a> {
  pub fn record(self) -> Option<&'a CatalogRecord> {
    match self {
      Self::Unmatched => None,
      Self::Matched(r) | Self::Ambiguous { chosen: r, .. } => Some(r),
    }
  }
}

/// Catalog records grouped by `(title, artist_name)`, each group sorted by
/// `song_id` so the tie-break is a first-match scan.
pub struct CatalogIndex<'a> {
  by_key:    HashMap<(&'a str, &'a str), Vec<&'a CatalogRecord>>,
  tolerance: f64,
}

impl<'a> CatalogIndex<'a> {
  pub fn new(catalog: &'a [CatalogRecord], tolerance: f64) -> Self {
    let mut by_key: HashMap<(&str, &str), Vec<&CatalogRecord>> = HashMap::new();
    for record in catalog {
      by_key
        .entry((record.title.as_str(), record.artist_name.as_str()))
        .or_default()
        .push(record);
    }
    for group in by_key.values_mut() {
      group.sort_by(|a, b| a.song_id.cmp(&b.song_id));
    }
    Self { by_key, tolerance }
  }

  /// Match a play. Plays lacking a title, artist, or length never match.
  pub fn resolve(&self, event: &EventRecord) -> Resolution<'a> {
    let (Some(title), Some(artist), Some(length)) = (
      event.song_title.as_deref(),
      event.artist_name.as_deref(),
      event.duration,
    ) else {
      return Resolution::Unmatched;
    };
    let Some(group) = self.by_key.get(&(title, artist)) else {
      return Resolution::Unmatched;
    };

    let mut matches = group
      .iter()
      .filter(|r| (r.duration - length).abs() < self.tolerance);
    let Some(&chosen) = matches.next() else {
      return Resolution::Unmatched;
    };
    match matches.count() {
      0 => Resolution::Matched(chosen),
      rest => Resolution::Ambiguous {
        chosen,
        candidates: rest + 1,
      },
    }
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Match statistics for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SongplayReport {
  pub rows:       usize,
  pub matched:    usize,
  /// Plays that matched more than one catalog record.
  pub ambiguous:  usize,
  pub partitions: usize,
}

/// Build the `songplays` table in play order.
///
/// Every play must carry `userId`, `level`, and `sessionId`.
pub fn resolve_songplays(
  plays: &[&EventRecord],
  catalog: &[CatalogRecord],
  tolerance: f64,
  rows_per_partition: usize,
) -> Result<(Vec<SongplayFact>, SongplayReport)> {
  if rows_per_partition == 0 {
    return Err(Error::Options("rows_per_partition must be positive".into()));
  }
  if u32::try_from(rows_per_partition - 1).is_err() {
    return Err(Error::IdSpace(format!(
      "{rows_per_partition} rows per partition"
    )));
  }

  let index = CatalogIndex::new(catalog, tolerance);

  let partitions: Vec<(Vec<SongplayFact>, SongplayReport)> = plays
    .par_chunks(rows_per_partition)
    .enumerate()
    .map(|(partition, chunk)| {
      let partition = u32::try_from(partition)
        .map_err(|_| Error::IdSpace(format!("partition {partition}")))?;
      resolve_partition(&index, partition, chunk)
    })
    .collect::<Result<_>>()?;

  let mut report = SongplayReport {
    partitions: partitions.len(),
    ..Default::default()
  };
  let mut rows = Vec::with_capacity(plays.len());
  for (part_rows, part_report) in partitions {
    report.rows += part_report.rows;
    report.matched += part_report.matched;
    report.ambiguous += part_report.ambiguous;
    rows.extend(part_rows);
  }

  Ok((rows, report))
}

fn resolve_partition(
  index: &CatalogIndex<'_>,
  partition: u32,
  chunk: &[&EventRecord],
) -> Result<(Vec<SongplayFact>, SongplayReport)> {
  let mut report = SongplayReport::default();
  let mut rows = Vec::with_capacity(chunk.len());

  for (sequence, &event) in (0u32..).zip(chunk) {
    let start_time = event.timestamp()?;
    let resolution = index.resolve(event);

    if let Resolution::Ambiguous { chosen, candidates } = resolution {
      report.ambiguous += 1;
      debug!(
        ts = event.ts,
        song_id = %chosen.song_id,
        candidates,
        "ambiguous catalog match; picked lowest song_id"
      );
    }
    let matched = resolution.record();
    if matched.is_some() {
      report.matched += 1;
    }

    rows.push(SongplayFact {
      songplay_id: SongplayId::new(partition, sequence),
      start_time,
      user_id: event.require_user_id()?.to_owned(),
      level: event.require_level()?,
      song_id: matched.map(|r| r.song_id.clone()),
      artist_id: matched.map(|r| r.artist_id.clone()),
      session_id: event.require_session_id()?,
      location: event.location.clone(),
      user_agent: event.user_agent.clone(),
      year: start_time.year(),
      month: start_time.month(),
    });
  }

  report.rows = rows.len();
  Ok((rows, report))
}
