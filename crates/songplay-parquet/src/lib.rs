//! Partitioned Parquet sink for the songplay star schema.
//!
//! Tables are written Hive-style (`<table>/<column>=<value>/part-*.parquet`)
//! into a per-run staging directory and moved into place on commit. File
//! I/O runs on tokio's blocking pool so the async runtime is never stalled.

mod encode;
mod partition;
mod schema;
mod sink;

pub mod error;

pub use error::{Error, Result};
pub use sink::{Codec, ParquetSink, SinkOptions};
