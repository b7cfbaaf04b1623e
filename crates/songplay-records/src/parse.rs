//! JSON record decoder.
//!
//! Pipeline:
//!   raw &str
//!     └─ serde_json stream      → RawCatalog / RawEvent (everything optional)
//!          └─ into_record()     → CatalogRecord / EventRecord (schema enforced)

use std::{path::Path, str::FromStr};

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use songplay_core::record::{CatalogRecord, EventRecord, Level};

use crate::error::{Error, Result};

// ─── Raw shapes ──────────────────────────────────────────────────────────────

/// A catalog object exactly as found on disk. Unknown keys (`num_songs`,
/// ...) are ignored.
#[derive(Deserialize)]
struct RawCatalog {
  song_id:          Option<String>,
  artist_id:        Option<String>,
  artist_name:      Option<String>,
  artist_location:  Option<String>,
  artist_latitude:  Option<f64>,
  artist_longitude: Option<f64>,
  title:            Option<String>,
  duration:         Option<f64>,
  year:             Option<i32>,
}

/// An event-log object exactly as found on disk.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
  #[serde(default, deserialize_with = "string_or_int")]
  user_id:    Option<String>,
  first_name: Option<String>,
  last_name:  Option<String>,
  gender:     Option<String>,
  level:      Option<String>,
  song:       Option<String>,
  artist:     Option<String>,
  length:     Option<f64>,
  session_id: Option<i64>,
  user_agent: Option<String>,
  location:   Option<String>,
  page:       Option<String>,
  ts:         Option<i64>,
}

/// Logged-out traffic carries `"userId": ""`; some exports write the id as a
/// bare number.
fn string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Scalar {
    Str(String),
    Int(i64),
  }

  let value = Option::<Scalar>::deserialize(deserializer)?;
  Ok(
    value
      .map(|s| match s {
        Scalar::Str(s) => s,
        Scalar::Int(i) => i.to_string(),
      })
      .and_then(non_empty_string),
  )
}

// ─── Schema enforcement ──────────────────────────────────────────────────────

fn required<T>(
  record: &'static str,
  field: &'static str,
  value: Option<T>,
) -> songplay_core::Result<T> {
  value.ok_or(songplay_core::Error::MissingField { record, field })
}

/// Identifiers must be present and non-blank.
fn required_id(
  record: &'static str,
  field: &'static str,
  value: Option<String>,
) -> songplay_core::Result<String> {
  required(record, field, value.and_then(non_empty_string))
}

fn non_empty_string(s: String) -> Option<String> {
  if s.trim().is_empty() { None } else { Some(s) }
}

impl RawCatalog {
  fn into_record(self) -> songplay_core::Result<CatalogRecord> {
    const R: &str = "catalog";
    Ok(CatalogRecord {
      song_id:          required_id(R, "song_id", self.song_id)?,
      artist_id:        required_id(R, "artist_id", self.artist_id)?,
      artist_name:      required(R, "artist_name", self.artist_name)?,
      artist_location:  self.artist_location.and_then(non_empty_string),
      artist_latitude:  self.artist_latitude,
      artist_longitude: self.artist_longitude,
      title:            required(R, "title", self.title)?,
      duration:         required(R, "duration", self.duration)?,
      year:             required(R, "year", self.year)?,
    })
  }
}

impl RawEvent {
  fn into_record(self) -> songplay_core::Result<EventRecord> {
    const R: &str = "event";
    let level = self
      .level
      .and_then(non_empty_string)
      .map(|raw| {
        Level::from_str(&raw).map_err(|_| songplay_core::Error::InvalidValue {
          field: "level",
          value: raw,
        })
      })
      .transpose()?;

    Ok(EventRecord {
      user_id: self.user_id,
      first_name: self.first_name,
      last_name: self.last_name,
      gender: self.gender,
      level,
      song_title: self.song,
      artist_name: self.artist,
      duration: self.length,
      session_id: self.session_id,
      user_agent: self.user_agent,
      location: self.location.and_then(non_empty_string),
      page: required(R, "page", self.page)?,
      ts: required(R, "ts", self.ts)?,
    })
  }
}

// ─── Stream decoding ─────────────────────────────────────────────────────────

/// 1-based line number of byte `offset` in `input`.
fn line_at(input: &str, offset: usize) -> usize {
  let end = offset.min(input.len());
  input.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Decode every JSON value in `input` (whitespace- or newline-separated, so
/// both JSON-lines and single pretty-printed objects work) and convert each
/// with `convert`.
fn decode_all<Raw, T>(
  input: &str,
  origin: &Path,
  convert: impl Fn(Raw) -> songplay_core::Result<T>,
) -> Result<Vec<T>>
where
  Raw: DeserializeOwned,
{
  let mut stream = serde_json::Deserializer::from_str(input).into_iter::<Raw>();
  let mut records = Vec::new();

  loop {
    // Skip leading whitespace so the reported line is where the value starts.
    let start = stream.byte_offset();
    let start = start
      + input[start..]
        .bytes()
        .take_while(u8::is_ascii_whitespace)
        .count();

    let Some(next) = stream.next() else { break };
    let raw = next.map_err(|source| Error::Decode {
      path: origin.to_path_buf(),
      line: source.line().max(1),
      source,
    })?;
    let record = convert(raw).map_err(|source| Error::Schema {
      path: origin.to_path_buf(),
      line: line_at(input, start),
      source,
    })?;
    records.push(record);
  }

  Ok(records)
}

pub(crate) fn parse_catalog(
  input: &str,
  origin: &Path,
) -> Result<Vec<CatalogRecord>> {
  decode_all(input, origin, RawCatalog::into_record)
}

pub(crate) fn parse_events(
  input: &str,
  origin: &Path,
) -> Result<Vec<EventRecord>> {
  decode_all(input, origin, RawEvent::into_record)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn origin() -> &'static Path { Path::new("test.json") }

  const SONG: &str = r#"{"num_songs": 1, "artist_id": "ARJIE2Y1187B994AB7", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "Line Renaud", "song_id": "SOUPIRU12A6D4FA1E1", "title": "Der Kleine Dompfaff", "duration": 152.92036, "year": 0}"#;

  const PLAY: &str = r#"{"artist":"Harmonia","auth":"Logged In","firstName":"Ryan","gender":"M","itemInSession":0,"lastName":"Smith","length":655.77751,"level":"free","location":"San Jose-Sunnyvale-Santa Clara, CA","method":"PUT","page":"NextSong","registration":1541016707796.0,"sessionId":583,"song":"Sehr kosmisch","status":200,"ts":1542241826796,"userAgent":"Mozilla\/5.0","userId":"26"}"#;

  const HOME: &str = r#"{"artist":null,"auth":"Logged Out","firstName":null,"gender":null,"itemInSession":0,"lastName":null,"length":null,"level":"free","location":null,"method":"GET","page":"Home","registration":null,"sessionId":52,"song":null,"status":200,"ts":1541207073796,"userAgent":null,"userId":""}"#;

  #[test]
  fn catalog_object_decodes() {
    let records = parse_catalog(SONG, origin()).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.song_id, "SOUPIRU12A6D4FA1E1");
    assert_eq!(r.artist_name, "Line Renaud");
    assert_eq!(r.year, 0);
    assert!(r.artist_location.is_none(), "blank location becomes None");
    assert!(r.artist_latitude.is_none());
    assert!((r.duration - 152.92036).abs() < f64::EPSILON);
  }

  #[test]
  fn pretty_printed_catalog_object_decodes() {
    let input = "{\n  \"song_id\": \"S1\",\n  \"artist_id\": \"A1\",\n  \
                 \"artist_name\": \"Beck\",\n  \"title\": \"Loser\",\n  \
                 \"duration\": 180.0,\n  \"year\": 1994\n}\n";
    let records = parse_catalog(input, origin()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Loser");
  }

  #[test]
  fn catalog_missing_song_id_fails_with_line() {
    let input = format!(
      "{SONG}\n{}",
      r#"{"artist_id":"A","artist_name":"B","title":"T","duration":1.0,"year":2000}"#
    );
    let err = parse_catalog(&input, origin()).unwrap_err();
    match err {
      Error::Schema {
        line,
        source: songplay_core::Error::MissingField { field, .. },
        ..
      } => {
        assert_eq!(line, 2);
        assert_eq!(field, "song_id");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn catalog_wrong_type_is_a_decode_error() {
    let input = r#"{"song_id":"S","artist_id":"A","artist_name":"B","title":"T","duration":"long","year":2000}"#;
    assert!(matches!(
      parse_catalog(input, origin()),
      Err(Error::Decode { line: 1, .. })
    ));
  }

  #[test]
  fn event_lines_decode_in_order() {
    let input = format!("{PLAY}\n\n{HOME}\n");
    let events = parse_events(&input, origin()).unwrap();
    assert_eq!(events.len(), 2);

    let play = &events[0];
    assert!(play.is_play());
    assert_eq!(play.user_id.as_deref(), Some("26"));
    assert_eq!(play.level, Some(Level::Free));
    assert_eq!(play.song_title.as_deref(), Some("Sehr kosmisch"));
    assert_eq!(play.artist_name.as_deref(), Some("Harmonia"));
    assert_eq!(play.session_id, Some(583));
    assert_eq!(play.ts, 1_542_241_826_796);

    let home = &events[1];
    assert!(!home.is_play());
    assert!(home.user_id.is_none(), "empty userId becomes None");
    assert!(home.song_title.is_none());
  }

  #[test]
  fn numeric_user_id_is_normalised_to_string() {
    let input = r#"{"userId": 7, "page": "NextSong", "ts": 1}"#;
    let events = parse_events(input, origin()).unwrap();
    assert_eq!(events[0].user_id.as_deref(), Some("7"));
  }

  #[test]
  fn unknown_level_is_rejected() {
    let input = r#"{"userId": "7", "level": "gold", "page": "NextSong", "ts": 1}"#;
    let err = parse_events(input, origin()).unwrap_err();
    assert!(matches!(err, Error::Schema {
      source: songplay_core::Error::InvalidValue { field: "level", .. },
      ..
    }));
  }

  #[test]
  fn event_without_ts_is_rejected() {
    let input = r#"{"userId": "7", "page": "NextSong"}"#;
    assert!(matches!(
      parse_events(input, origin()),
      Err(Error::Schema { .. })
    ));
  }

  #[test]
  fn truncated_line_is_a_decode_error() {
    let input = format!("{PLAY}\n{{\"page\": \"Home\"");
    assert!(matches!(
      parse_events(&input, origin()),
      Err(Error::Decode { line: 2, .. })
    ));
  }
}
