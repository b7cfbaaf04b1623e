//! Catalog extractor: song catalog → `songs` and `artists` dimensions.
//!
//! Both tables are plain projections. Duplicate `song_id` / `artist_id` rows
//! pass through unchanged unless deduplication is requested, in which case
//! the first row per key (in catalog order) is kept.

use std::collections::HashSet;

use rayon::prelude::*;
use songplay_core::{
  record::CatalogRecord,
  table::{ArtistDim, SongDim},
};

pub fn extract_songs(catalog: &[CatalogRecord]) -> Vec<SongDim> {
  catalog
    .par_iter()
    .map(|r| SongDim {
      song_id:   r.song_id.clone(),
      artist_id: r.artist_id.clone(),
      year:      r.year,
      duration:  r.duration,
    })
    .collect()
}

pub fn extract_artists(catalog: &[CatalogRecord]) -> Vec<ArtistDim> {
  catalog
    .par_iter()
    .map(|r| ArtistDim {
      artist_id: r.artist_id.clone(),
      name:      r.artist_name.clone(),
      location:  r.artist_location.clone(),
      latitude:  r.artist_latitude,
      longitude: r.artist_longitude,
    })
    .collect()
}

/// Keep the first row for each key, preserving order.
pub fn dedup_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
  K: Eq + std::hash::Hash,
  F: Fn(&T) -> K,
{
  let mut seen = HashSet::new();
  rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(song_id: &str, artist_id: &str) -> CatalogRecord {
    CatalogRecord {
      song_id: song_id.into(),
      artist_id: artist_id.into(),
      artist_name: format!("name-{artist_id}"),
      artist_location: Some("Berlin".into()),
      artist_latitude: Some(52.5),
      artist_longitude: None,
      title: format!("title-{song_id}"),
      duration: 200.5,
      year: 2001,
    }
  }

  #[test]
  fn songs_project_catalog_columns() {
    let songs = extract_songs(&[record("S1", "A1")]);
    assert_eq!(songs, vec![SongDim {
      song_id:   "S1".into(),
      artist_id: "A1".into(),
      year:      2001,
      duration:  200.5,
    }]);
  }

  #[test]
  fn artists_project_catalog_columns() {
    let artists = extract_artists(&[record("S1", "A1")]);
    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].name, "name-A1");
    assert_eq!(artists[0].location.as_deref(), Some("Berlin"));
    assert_eq!(artists[0].latitude, Some(52.5));
    assert_eq!(artists[0].longitude, None);
  }

  #[test]
  fn duplicates_pass_through_by_default() {
    let catalog = [record("S1", "A1"), record("S2", "A1"), record("S1", "A1")];
    assert_eq!(extract_songs(&catalog).len(), 3);
    assert_eq!(extract_artists(&catalog).len(), 3);
  }

  #[test]
  fn dedup_keeps_first_occurrence() {
    let catalog = [record("S1", "A1"), record("S2", "A1"), record("S1", "A2")];
    let songs = dedup_by_key(extract_songs(&catalog), |s| s.song_id.clone());
    let ids: Vec<_> = songs.iter().map(|s| s.artist_id.as_str()).collect();
    assert_eq!(ids, ["A1", "A1"]);

    let artists =
      dedup_by_key(extract_artists(&catalog), |a| a.artist_id.clone());
    assert_eq!(artists.len(), 2);
  }
}
