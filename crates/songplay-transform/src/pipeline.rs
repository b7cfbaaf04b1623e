//! Batch orchestration: two record streams in, five tables out.
//!
//! [`transform`] is a pure function of its inputs. [`publish`] hands the
//! result to a [`TableSink`], writing the tables concurrently and committing
//! only when all five succeeded. [`run`] does both, with the CPU-bound
//! transform on tokio's blocking pool.

use songplay_core::{
  record::{CatalogRecord, EventRecord},
  sink::{TableReport, TableSink},
  table::{ArtistDim, SongDim, SongplayFact, TimeDim, UserDim},
};
use tracing::{info, warn};

use crate::{
  Error, Result, catalog,
  events::filter_plays,
  songplays::{SongplayReport, resolve_songplays},
  time::extract_time,
  users::extract_users,
};

/// Tuning knobs for [`transform`].
#[derive(Debug, Clone)]
pub struct TransformOptions {
  /// Maximum duration difference, in seconds, for a play to match a catalog
  /// record.
  pub duration_tolerance: f64,
  /// Plays per songplay partition.
  pub rows_per_partition: usize,
  /// Keep only the first catalog row per `song_id` / `artist_id`.
  pub dedup_catalog:      bool,
}

impl Default for TransformOptions {
  fn default() -> Self {
    Self {
      duration_tolerance: 0.01,
      rows_per_partition: 10_000,
      dedup_catalog:      false,
    }
  }
}

/// The five output tables of one run.
#[derive(Debug, Clone, Default)]
pub struct StarSchema {
  pub songs:     Vec<SongDim>,
  pub artists:   Vec<ArtistDim>,
  pub users:     Vec<UserDim>,
  pub time:      Vec<TimeDim>,
  pub songplays: Vec<SongplayFact>,
}

/// Summary of a published run.
#[derive(Debug, Clone)]
pub struct RunReport {
  pub tables:    Vec<TableReport>,
  pub songplays: SongplayReport,
}

/// Derive all five tables from the raw catalog and event log.
pub fn transform(
  catalog: &[CatalogRecord],
  events: &[EventRecord],
  options: &TransformOptions,
) -> Result<(StarSchema, SongplayReport)> {
  if !options.duration_tolerance.is_finite() || options.duration_tolerance <= 0.0
  {
    return Err(Error::Options(format!(
      "duration_tolerance must be a positive number, got {}",
      options.duration_tolerance
    )));
  }

  let mut songs = catalog::extract_songs(catalog);
  let mut artists = catalog::extract_artists(catalog);
  if options.dedup_catalog {
    songs = catalog::dedup_by_key(songs, |s| s.song_id.clone());
    artists = catalog::dedup_by_key(artists, |a| a.artist_id.clone());
  }
  info!(songs = songs.len(), artists = artists.len(), "extracted catalog");

  let plays = filter_plays(events);
  info!(events = events.len(), plays = plays.len(), "filtered plays");

  let users = extract_users(&plays)?;
  let time = extract_time(&plays)?;
  let (songplays, report) = resolve_songplays(
    &plays,
    catalog,
    options.duration_tolerance,
    options.rows_per_partition,
  )?;
  info!(
    users = users.len(),
    time = time.len(),
    songplays = report.rows,
    matched = report.matched,
    "extracted plays"
  );
  if report.ambiguous > 0 {
    warn!(
      ambiguous = report.ambiguous,
      "plays matched more than one catalog song; lowest song_id was used"
    );
  }

  Ok((
    StarSchema {
      songs,
      artists,
      users,
      time,
      songplays,
    },
    report,
  ))
}

/// Write every table through `sink`, then commit. If a write or the commit
/// fails the sink is aborted and the first error is returned. Every write
/// runs to completion before the sink is aborted.
pub async fn publish<S>(sink: &S, schema: StarSchema) -> Result<Vec<TableReport>>
where
  S: TableSink,
{
  let StarSchema {
    songs,
    artists,
    users,
    time,
    songplays,
  } = schema;

  let (songs, artists, users, time, songplays) = tokio::join!(
    sink.write_songs(songs),
    sink.write_artists(artists),
    sink.write_users(users),
    sink.write_time(time),
    sink.write_songplays(songplays)
  );
  let written = songs
    .and_then(|songs| Ok((songs, artists?, users?, time?, songplays?)));

  let (songs, artists, users, time, songplays) = match written {
    Ok(reports) => reports,
    Err(e) => {
      abort(sink).await;
      return Err(Error::sink(e));
    }
  };

  if let Err(e) = sink.commit().await {
    abort(sink).await;
    return Err(Error::sink(e));
  }
  let tables = vec![songs, artists, users, time, songplays];
  for t in &tables {
    info!(
      table = %t.table,
      rows = t.rows,
      partitions = t.partitions,
      files = t.files,
      "published"
    );
  }
  Ok(tables)
}

/// Transform and publish in one go. The sink is aborted if the transform
/// fails, so nothing is published for a bad batch.
pub async fn run<S>(
  catalog: Vec<CatalogRecord>,
  events: Vec<EventRecord>,
  sink: &S,
  options: &TransformOptions,
) -> Result<RunReport>
where
  S: TableSink,
{
  let options = options.clone();
  let transformed = tokio::task::spawn_blocking(move || {
    transform(&catalog, &events, &options)
  })
  .await
  .map_err(Error::from)
  .and_then(|out| out);

  let (schema, songplays) = match transformed {
    Ok(out) => out,
    Err(e) => {
      abort(sink).await;
      return Err(e);
    }
  };
  let tables = publish(sink, schema).await?;
  Ok(RunReport { tables, songplays })
}

async fn abort<S: TableSink>(sink: &S) {
  if let Err(e) = sink.abort().await {
    warn!(error = %e, "failed to discard partial output");
  }
}
