//! Batch driver for the songplay ETL.
//!
//! Reads the song catalog and event log below an input root, derives the
//! star schema and publishes it as partitioned Parquet below an output root.

use std::path::PathBuf;

use anyhow::Context as _;
use serde::Deserialize;
use songplay_parquet::{Codec, ParquetSink, SinkOptions};
use songplay_records::Layout;
use songplay_transform::{RunReport, TransformOptions};
use thiserror::Error;
use tracing::info;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `songplay.toml` and `SONGPLAY_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
  pub input_path:         PathBuf,
  pub output_path:        PathBuf,
  /// Catalog directory, relative to `input_path`.
  pub song_data:          PathBuf,
  /// Path components between `song_data` and a catalog file, file included.
  pub song_depth:         usize,
  /// Event-log directory, relative to `input_path`.
  pub log_data:           PathBuf,
  pub log_depth:          usize,
  pub rows_per_partition: usize,
  pub duration_tolerance: f64,
  pub dedup_catalog:      bool,
  pub compression:        Codec,
}

impl Default for EtlConfig {
  fn default() -> Self {
    let catalog = Layout::catalog_default();
    let events = Layout::events_default();
    let transform = TransformOptions::default();
    Self {
      input_path:         PathBuf::new(),
      output_path:        PathBuf::new(),
      song_data:          catalog.dir,
      song_depth:         catalog.depth,
      log_data:           events.dir,
      log_depth:          events.depth,
      rows_per_partition: transform.rows_per_partition,
      duration_tolerance: transform.duration_tolerance,
      dedup_catalog:      transform.dedup_catalog,
      compression:        Codec::default(),
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{0} is not set")]
  MissingPath(&'static str),

  #[error("input path {0:?} does not exist")]
  InputNotFound(PathBuf),

  #[error("duration_tolerance must be a positive number, got {0}")]
  Tolerance(f64),

  #[error("rows_per_partition must be at least 1")]
  RowsPerPartition,

  #[error("{0} must be at least 1")]
  Depth(&'static str),
}

impl EtlConfig {
  /// Check the configuration before anything is read or written.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.input_path.as_os_str().is_empty() {
      return Err(ConfigError::MissingPath("input_path"));
    }
    if self.output_path.as_os_str().is_empty() {
      return Err(ConfigError::MissingPath("output_path"));
    }
    if !self.input_path.is_dir() {
      return Err(ConfigError::InputNotFound(self.input_path.clone()));
    }
    if !self.duration_tolerance.is_finite() || self.duration_tolerance <= 0.0 {
      return Err(ConfigError::Tolerance(self.duration_tolerance));
    }
    if self.rows_per_partition == 0 {
      return Err(ConfigError::RowsPerPartition);
    }
    if self.song_depth == 0 {
      return Err(ConfigError::Depth("song_depth"));
    }
    if self.log_depth == 0 {
      return Err(ConfigError::Depth("log_depth"));
    }
    Ok(())
  }

  pub fn catalog_layout(&self) -> Layout {
    Layout::new(self.song_data.clone(), self.song_depth)
  }

  pub fn events_layout(&self) -> Layout {
    Layout::new(self.log_data.clone(), self.log_depth)
  }

  pub fn transform_options(&self) -> TransformOptions {
    TransformOptions {
      duration_tolerance: self.duration_tolerance,
      rows_per_partition: self.rows_per_partition,
      dedup_catalog:      self.dedup_catalog,
    }
  }

  pub fn sink_options(&self) -> SinkOptions {
    SinkOptions {
      codec: self.compression,
    }
  }
}

// ─── Run ─────────────────────────────────────────────────────────────────────

/// Execute one batch: validate, read both inputs, transform, publish.
pub async fn execute(config: &EtlConfig) -> anyhow::Result<RunReport> {
  config.validate().context("invalid configuration")?;

  let input = config.input_path.clone();
  let catalog_layout = config.catalog_layout();
  let events_layout = config.events_layout();
  let (catalog, events) = tokio::task::spawn_blocking(move || {
    rayon::join(
      || songplay_records::read_catalog(&input, &catalog_layout),
      || songplay_records::read_events(&input, &events_layout),
    )
  })
  .await
  .context("reader task failed")?;
  let catalog = catalog.context("failed to read song catalog")?;
  let events = events.context("failed to read event log")?;

  let sink = ParquetSink::create(config.output_path.clone(), config.sink_options())
    .with_context(|| {
      format!("failed to prepare output at {:?}", config.output_path)
    })?;
  info!(
    run_id = %sink.run_id(),
    output = %sink.root().display(),
    "writing star schema"
  );

  songplay_transform::run(catalog, events, &sink, &config.transform_options())
    .await
    .context("failed to build star schema")
}

#[cfg(test)]
mod tests {
  use std::{fs, path::Path};

  use super::*;

  const SONG: &str = r#"{"num_songs": 1, "artist_id": "ARJIE2Y1187B994AB7", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "Line Renaud", "song_id": "SOUPIRU12A6D4FA1E1", "title": "Der Kleine Dompfaff", "duration": 152.92036, "year": 0}"#;

  const EVENTS: &str = concat!(
    r#"{"artist":"Line Renaud","auth":"Logged In","firstName":"Ryan","gender":"M","itemInSession":0,"lastName":"Smith","length":152.92036,"level":"free","location":"San Jose-Sunnyvale-Santa Clara, CA","method":"PUT","page":"NextSong","registration":1.541016707796e+12,"sessionId":583,"song":"Der Kleine Dompfaff","status":200,"ts":1542241826796,"userAgent":"Mozilla\/5.0","userId":"26"}"#,
    "\n",
    r#"{"artist":null,"auth":"Logged Out","firstName":null,"gender":null,"itemInSession":1,"lastName":null,"length":null,"level":"free","location":null,"method":"GET","page":"Home","registration":null,"sessionId":583,"song":null,"status":200,"ts":1542241830000,"userAgent":null,"userId":""}"#,
    "\n",
  );

  fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn config_for(root: &Path) -> EtlConfig {
    EtlConfig {
      input_path: root.join("in"),
      output_path: root.join("out"),
      ..Default::default()
    }
  }

  #[test]
  fn defaults_match_source_layout() {
    let config = EtlConfig::default();
    assert_eq!(config.song_data, Path::new("song_data"));
    assert_eq!(config.song_depth, 4);
    assert_eq!(config.log_data, Path::new("log_data"));
    assert_eq!(config.log_depth, 3);
    assert_eq!(config.rows_per_partition, 10_000);
    assert_eq!(config.compression, Codec::Snappy);
    assert!(!config.dedup_catalog);
  }

  #[test]
  fn missing_paths_are_rejected() {
    assert!(matches!(
      EtlConfig::default().validate(),
      Err(ConfigError::MissingPath("input_path"))
    ));
  }

  #[test]
  fn absent_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    assert!(matches!(config.validate(), Err(ConfigError::InputNotFound(_))));
  }

  #[test]
  fn bad_tuning_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("in")).unwrap();

    let config = EtlConfig {
      duration_tolerance: f64::NAN,
      ..config_for(dir.path())
    };
    assert!(matches!(config.validate(), Err(ConfigError::Tolerance(_))));

    let config = EtlConfig {
      rows_per_partition: 0,
      ..config_for(dir.path())
    };
    assert!(matches!(config.validate(), Err(ConfigError::RowsPerPartition)));

    let config = EtlConfig {
      log_depth: 0,
      ..config_for(dir.path())
    };
    assert!(matches!(config.validate(), Err(ConfigError::Depth("log_depth"))));
  }

  #[tokio::test]
  async fn execute_publishes_star_schema() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write(&input.join("song_data/A/B/C/TRABCEI128F424C983.json"), SONG);
    write(&input.join("log_data/2018/11/2018-11-15-events.json"), EVENTS);

    let config = config_for(dir.path());
    let report = execute(&config).await.unwrap();

    assert_eq!(report.songplays.rows, 1);
    assert_eq!(report.songplays.matched, 1);
    assert_eq!(report.tables.len(), 5);

    let out = &config.output_path;
    assert!(out.join("songs/year=0/artist_id=ARJIE2Y1187B994AB7").is_dir());
    assert!(out.join("time/year=2018/month=11").is_dir());
    assert!(out.join("songplays/year=2018/month=11").is_dir());
    assert!(out.join("users/_SUCCESS").is_file());
  }

  #[tokio::test]
  async fn invalid_input_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write(&input.join("song_data/A/B/C/TRBROKEN.json"), r#"{"song_id": 5}"#);
    write(&input.join("log_data/2018/11/2018-11-15-events.json"), EVENTS);

    let config = config_for(dir.path());
    assert!(execute(&config).await.is_err());
    assert!(!config.output_path.join("songs").exists());
  }

  #[tokio::test]
  async fn failed_write_leaves_no_staging_behind() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    // A partition directory name longer than any filesystem allows.
    let artist_id = "A".repeat(300);
    write(
      &input.join("song_data/A/B/C/TRLONG.json"),
      &format!(
        r#"{{"artist_id": "{artist_id}", "artist_name": "X", "song_id": "S1", "title": "T", "duration": 1.0, "year": 2000}}"#
      ),
    );
    // One play per month keeps the songplays write busy with many files.
    let month_ms = 31 * 24 * 3600 * 1000_i64;
    let events: String = (0..600)
      .map(|i| {
        format!(
          r#"{{"userId": "1", "level": "free", "sessionId": 1, "page": "NextSong", "ts": {}}}"#,
          946_684_800_000 + i * month_ms
        ) + "\n"
      })
      .collect();
    write(&input.join("log_data/2000/01/events.json"), &events);

    let config = config_for(dir.path());
    assert!(execute(&config).await.is_err());

    let leftovers: Vec<_> = fs::read_dir(&config.output_path)
      .unwrap()
      .filter_map(Result::ok)
      .map(|e| e.file_name())
      .collect();
    assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
  }
}
