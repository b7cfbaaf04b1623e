//! Star-schema transform for song catalogs and listening logs.
//!
//! Derives the `songs`, `artists`, `users`, `time`, and `songplays` tables
//! from decoded [`songplay_core::record`] streams. Every extractor is a pure
//! function over borrowed input; per-row work runs on the rayon pool.
//!
//! # Usage
//!
//! ```rust,ignore
//! let report = songplay_transform::run(&catalog, &events, &sink, &options).await?;
//! ```

pub mod catalog;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod songplays;
pub mod time;
pub mod users;

pub use error::{Error, Result};
pub use pipeline::{
  RunReport, StarSchema, TransformOptions, publish, run, transform,
};
