//! Core types and trait definitions for the songplay star-schema transform.
//!
//! This crate is deliberately free of file-format and I/O dependencies.
//! Readers, transforms, and sinks depend on it; it depends on nothing but
//! plain data crates.

pub mod error;
pub mod record;
pub mod sink;
pub mod table;
pub mod timestamp;

pub use error::{Error, Result};
