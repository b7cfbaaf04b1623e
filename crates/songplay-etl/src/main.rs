//! songplay-etl binary.
//!
//! Reads `songplay.toml` (or the path given with `--config`), layers
//! `SONGPLAY_*` environment variables and command-line overrides on top, and
//! runs one batch.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use songplay_etl::EtlConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
  author,
  version,
  about = "Build the songplay star schema from raw JSON logs"
)]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "songplay.toml")]
  config: PathBuf,

  /// Input root containing the catalog and event-log directories.
  #[arg(short, long)]
  input: Option<PathBuf>,

  /// Output root for the Parquet tables.
  #[arg(short, long)]
  output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SONGPLAY").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let mut cfg: EtlConfig = settings
    .try_deserialize()
    .context("failed to deserialise EtlConfig")?;
  if let Some(input) = cli.input {
    cfg.input_path = input;
  }
  if let Some(output) = cli.output {
    cfg.output_path = output;
  }
  cfg.input_path = expand_tilde(&cfg.input_path);
  cfg.output_path = expand_tilde(&cfg.output_path);

  let report = songplay_etl::execute(&cfg).await?;

  let plays = &report.songplays;
  tracing::info!(
    songplays = plays.rows,
    matched = plays.matched,
    unmatched = plays.rows - plays.matched,
    ambiguous = plays.ambiguous,
    partitions = plays.partitions,
    "run complete"
  );
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
