//! [`ParquetSink`], the Parquet implementation of [`TableSink`].

use std::{
  collections::BTreeMap,
  fs::{self, File},
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use parquet::{
  arrow::ArrowWriter,
  basic::{Compression, ZstdLevel},
  file::properties::WriterProperties,
};
use serde::Deserialize;
use songplay_core::{
  sink::{TableReport, TableSink},
  table::{
    ArtistDim, PartitionValue, SongDim, SongplayFact, Table, TimeDim, UserDim,
  },
};
use strum::{Display, EnumString, IntoEnumIterator};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{Error, Result, encode::Encode, partition};

/// Marker written into each table directory once its files are complete.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Directory inside staging where replaced tables wait during a commit.
pub(crate) const REPLACED_DIR: &str = "_replaced";

// ─── Options ─────────────────────────────────────────────────────────────────

/// Parquet page compression.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Codec {
  #[default]
  Snappy,
  Zstd,
  None,
}

impl Codec {
  fn compression(self) -> Compression {
    match self {
      Self::Snappy => Compression::SNAPPY,
      Self::Zstd => Compression::ZSTD(ZstdLevel::default()),
      Self::None => Compression::UNCOMPRESSED,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
  pub codec: Codec,
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Writes the star schema below `root`, one directory per table.
///
/// Everything is first written to `root/_staging-<run_id>/`; [`commit`]
/// swaps the staged tables in, [`abort`] deletes them. Both wait for every
/// write already handed to the blocking pool, including writes whose future
/// was dropped.
///
/// [`commit`]: TableSink::commit
/// [`abort`]: TableSink::abort
pub struct ParquetSink {
  root:    PathBuf,
  staging: PathBuf,
  run_id:  Uuid,
  props:   Arc<WriterProperties>,
  closed:  AtomicBool,
  /// Held shared by each blocking write, exclusively by commit and abort.
  writers: Arc<RwLock<()>>,
}

impl ParquetSink {
  /// Prepare a run below `root`, creating the root and a fresh staging
  /// directory.
  pub fn create(root: impl Into<PathBuf>, options: SinkOptions) -> Result<Self> {
    let root = root.into();
    let run_id = Uuid::new_v4();
    let staging = root.join(format!("_staging-{run_id}"));
    fs::create_dir_all(&staging)
      .map_err(Error::io("create staging directory", &staging))?;

    let props = WriterProperties::builder()
      .set_compression(options.codec.compression())
      .build();

    Ok(Self {
      root,
      staging,
      run_id,
      props: Arc::new(props),
      closed: AtomicBool::new(false),
      writers: Arc::new(RwLock::new(())),
    })
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn run_id(&self) -> Uuid { self.run_id }

  fn ensure_open(&self) -> Result<()> {
    if self.closed.load(Ordering::Acquire) {
      return Err(Error::Closed);
    }
    Ok(())
  }

  async fn write_table<R: Encode>(&self, rows: Vec<R>) -> Result<TableReport> {
    self.ensure_open()?;
    // The guard moves into the blocking task, so it is released only when
    // the files are written even if this future is dropped.
    let guard = Arc::clone(&self.writers).read_owned().await;
    self.ensure_open()?;

    let dir = self.staging.join(R::TABLE.as_ref());
    let props = Arc::clone(&self.props);
    let run_id = self.run_id;

    tokio::task::spawn_blocking(move || {
      let _guard = guard;
      write_partitions(&dir, &rows, &props, run_id)
    })
    .await?
  }
}

/// Group `rows` by partition key and write one file per partition.
fn write_partitions<R: Encode>(
  dir: &Path,
  rows: &[R],
  props: &WriterProperties,
  run_id: Uuid,
) -> Result<TableReport> {
  let mut groups: BTreeMap<Vec<PartitionValue>, Vec<&R>> = BTreeMap::new();
  for row in rows {
    groups.entry(row.partition_key()).or_default().push(row);
  }
  let columns = R::TABLE.partition_columns();
  if columns.is_empty() {
    // Unpartitioned tables always get one file, even when empty.
    groups.entry(Vec::new()).or_default();
  }

  if dir.exists() {
    fs::remove_dir_all(dir).map_err(Error::io("clear", dir))?;
  }
  fs::create_dir_all(dir).map_err(Error::io("create", dir))?;

  let table = R::TABLE;
  for (key, group) in &groups {
    let part_dir = dir.join(partition::relative_dir(columns, key));
    fs::create_dir_all(&part_dir).map_err(Error::io("create", &part_dir))?;

    let path = part_dir.join(format!("part-00000-{run_id}.parquet"));
    let batch = R::encode(group)?;
    let file = File::create(&path).map_err(Error::io("create", &path))?;
    let mut writer =
      ArrowWriter::try_new(file, batch.schema(), Some(props.clone()))?;
    writer.write(&batch)?;
    writer.close()?;
    debug!(%table, path = %path.display(), rows = group.len(), "wrote partition");
  }

  let marker = dir.join(SUCCESS_MARKER);
  File::create(&marker).map_err(Error::io("create", &marker))?;

  Ok(TableReport {
    table,
    rows:       rows.len(),
    partitions: groups.len(),
    files:      groups.len(),
  })
}

// ─── Publishing ──────────────────────────────────────────────────────────────

/// Move every staged table into `root`, replacing what was there.
///
/// Replaced tables are parked in the staging directory until all moves have
/// succeeded; on failure the moves done so far are rolled back. A table whose
/// rollback fails stays parked, and [`discard`] keeps it.
fn promote(root: &Path, staging: &Path) -> Result<()> {
  for table in Table::iter() {
    let staged = staging.join(table.as_ref());
    if !staged.join(SUCCESS_MARKER).is_file() {
      return Err(Error::MissingTable(table));
    }
  }

  let parked = staging.join(REPLACED_DIR);
  fs::create_dir_all(&parked).map_err(Error::io("create", &parked))?;

  let mut done: Vec<Table> = Vec::new();
  for table in Table::iter() {
    if let Err(e) = swap_in(root, staging, &parked, table) {
      for &undo in done.iter().rev() {
        if let Err(rollback) = swap_out(root, staging, &parked, undo) {
          error!(table = %undo, error = %rollback, "failed to roll back table");
        }
      }
      return Err(e);
    }
    done.push(table);
  }

  // The new tables are live; leftovers only cost disk space.
  if let Err(e) = fs::remove_dir_all(staging) {
    warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
  }
  Ok(())
}

fn swap_in(root: &Path, staging: &Path, parked: &Path, table: Table) -> Result<()> {
  let live = root.join(table.as_ref());
  let old = parked.join(table.as_ref());
  if live.exists() {
    fs::rename(&live, &old).map_err(Error::io("park", &live))?;
  }
  let staged = staging.join(table.as_ref());
  if let Err(e) = fs::rename(&staged, &live) {
    if old.exists()
      && let Err(restore) = fs::rename(&old, &live)
    {
      error!(%table, error = %restore, "failed to restore replaced table");
    }
    return Err(Error::io("publish", &staged)(e));
  }
  Ok(())
}

fn swap_out(root: &Path, staging: &Path, parked: &Path, table: Table) -> Result<()> {
  let live = root.join(table.as_ref());
  let staged = staging.join(table.as_ref());
  fs::rename(&live, &staged).map_err(Error::io("unpublish", &live))?;
  let old = parked.join(table.as_ref());
  if old.exists() {
    fs::rename(&old, &live).map_err(Error::io("restore", &old))?;
  }
  Ok(())
}

/// Delete the staging directory. Tables still parked by a failed rollback
/// are the only copy of the previous output and are left in place.
fn discard(staging: &Path) -> Result<()> {
  if !staging.exists() {
    return Ok(());
  }
  let parked = staging.join(REPLACED_DIR);
  let has_parked = fs::read_dir(&parked)
    .map(|mut entries| entries.next().is_some())
    .unwrap_or(false);
  if !has_parked {
    return fs::remove_dir_all(staging).map_err(Error::io("remove", staging));
  }

  warn!(
    path = %parked.display(),
    "previously published tables could not be restored; keeping them"
  );
  for entry in fs::read_dir(staging).map_err(Error::io("list", staging))? {
    let entry = entry.map_err(Error::io("list", staging))?;
    if entry.file_name() == REPLACED_DIR {
      continue;
    }
    let path = entry.path();
    if path.is_dir() {
      fs::remove_dir_all(&path).map_err(Error::io("remove", &path))?;
    } else {
      fs::remove_file(&path).map_err(Error::io("remove", &path))?;
    }
  }
  Ok(())
}

// ─── TableSink impl ──────────────────────────────────────────────────────────

impl TableSink for ParquetSink {
  type Error = Error;

  async fn write_songs(&self, rows: Vec<SongDim>) -> Result<TableReport> {
    self.write_table(rows).await
  }

  async fn write_artists(&self, rows: Vec<ArtistDim>) -> Result<TableReport> {
    self.write_table(rows).await
  }

  async fn write_users(&self, rows: Vec<UserDim>) -> Result<TableReport> {
    self.write_table(rows).await
  }

  async fn write_time(&self, rows: Vec<TimeDim>) -> Result<TableReport> {
    self.write_table(rows).await
  }

  async fn write_songplays(
    &self,
    rows: Vec<SongplayFact>,
  ) -> Result<TableReport> {
    self.write_table(rows).await
  }

  /// A failed commit leaves the sink open so that [`TableSink::abort`] can
  /// still discard the staged files.
  async fn commit(&self) -> Result<()> {
    self.ensure_open()?;
    let _writers = self.writers.write().await;
    let root = self.root.clone();
    let staging = self.staging.clone();
    tokio::task::spawn_blocking(move || promote(&root, &staging)).await??;
    self.closed.store(true, Ordering::Release);
    info!(root = %self.root.display(), run_id = %self.run_id, "committed tables");
    Ok(())
  }

  async fn abort(&self) -> Result<()> {
    if self.closed.swap(true, Ordering::AcqRel) {
      return Ok(());
    }
    let _writers = self.writers.write().await;
    let staging = self.staging.clone();
    tokio::task::spawn_blocking(move || discard(&staging)).await?
  }
}
