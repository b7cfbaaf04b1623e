//! Arrow schemas of the Parquet files, one per table.
//!
//! Partition columns live in the directory names and are therefore absent
//! from the file schemas.

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};

fn timestamp() -> DataType {
  DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Partitioned by `year`, `artist_id`.
pub static SONGS: LazyLock<SchemaRef> = LazyLock::new(|| {
  Arc::new(Schema::new(vec![
    Field::new("song_id", DataType::Utf8, false),
    Field::new("duration", DataType::Float64, false),
  ]))
});

pub static ARTISTS: LazyLock<SchemaRef> = LazyLock::new(|| {
  Arc::new(Schema::new(vec![
    Field::new("artist_id", DataType::Utf8, false),
    Field::new("name", DataType::Utf8, false),
    Field::new("location", DataType::Utf8, true),
    Field::new("latitude", DataType::Float64, true),
    Field::new("longitude", DataType::Float64, true),
  ]))
});

pub static USERS: LazyLock<SchemaRef> = LazyLock::new(|| {
  Arc::new(Schema::new(vec![
    Field::new("user_id", DataType::Utf8, false),
    Field::new("first_name", DataType::Utf8, true),
    Field::new("last_name", DataType::Utf8, true),
    Field::new("gender", DataType::Utf8, true),
    Field::new("level", DataType::Utf8, false),
  ]))
});

/// Partitioned by `year`, `month`.
pub static TIME: LazyLock<SchemaRef> = LazyLock::new(|| {
  Arc::new(Schema::new(vec![
    Field::new("timestamp", timestamp(), false),
    Field::new("hour", DataType::Int32, false),
    Field::new("day", DataType::Int32, false),
    Field::new("week", DataType::Int32, false),
    Field::new("weekday", DataType::Int32, false),
  ]))
});

/// Partitioned by `year`, `month`.
pub static SONGPLAYS: LazyLock<SchemaRef> = LazyLock::new(|| {
  Arc::new(Schema::new(vec![
    Field::new("songplay_id", DataType::UInt64, false),
    Field::new("start_time", timestamp(), false),
    Field::new("user_id", DataType::Utf8, false),
    Field::new("level", DataType::Utf8, false),
    Field::new("song_id", DataType::Utf8, true),
    Field::new("artist_id", DataType::Utf8, true),
    Field::new("session_id", DataType::Int64, false),
    Field::new("location", DataType::Utf8, true),
    Field::new("user_agent", DataType::Utf8, true),
  ]))
});
