//! Source records: the two weakly-typed input streams after decoding.
//!
//! A [`CatalogRecord`] describes one song together with its artist. An
//! [`EventRecord`] describes one client-side action; only actions whose
//! `page` is [`PLAY_PAGE`] are actual plays. Fields that non-play actions
//! legitimately omit are optional here and enforced by the extractors that
//! need them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, timestamp};

/// The `page` value that marks an event as a song play.
pub const PLAY_PAGE: &str = "NextSong";

// ─── Level ───────────────────────────────────────────────────────────────────

/// Account tier of a user at the time of an event.
///
/// Ordered `Free < Paid`; the ordering is used to break ties between
/// same-instant observations of one user.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
  Free,
  Paid,
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// One song-catalog entry. Source of truth for song and artist identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
  pub song_id:          String,
  pub artist_id:        String,
  pub artist_name:      String,
  pub artist_location:  Option<String>,
  pub artist_latitude:  Option<f64>,
  pub artist_longitude: Option<f64>,
  pub title:            String,
  /// Track length in seconds.
  pub duration:         f64,
  /// Release year; `0` when unknown upstream.
  pub year:             i32,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One logged client action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
  pub user_id:     Option<String>,
  pub first_name:  Option<String>,
  pub last_name:   Option<String>,
  pub gender:      Option<String>,
  pub level:       Option<Level>,
  pub song_title:  Option<String>,
  pub artist_name: Option<String>,
  /// Length of the played track in seconds, as reported by the client.
  pub duration:    Option<f64>,
  pub session_id:  Option<i64>,
  pub user_agent:  Option<String>,
  pub location:    Option<String>,
  pub page:        String,
  /// Epoch milliseconds.
  pub ts:          i64,
}

impl EventRecord {
  /// Whether this event is an actual song play.
  pub fn is_play(&self) -> bool { self.page == PLAY_PAGE }

  /// The event instant truncated to whole seconds.
  pub fn timestamp(&self) -> Result<DateTime<Utc>> {
    timestamp::from_epoch_millis(self.ts)
  }

  pub fn require_user_id(&self) -> Result<&str> {
    required(self.user_id.as_deref(), "userId")
  }

  pub fn require_level(&self) -> Result<Level> {
    required(self.level, "level")
  }

  pub fn require_session_id(&self) -> Result<i64> {
    required(self.session_id, "sessionId")
  }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T> {
  value.ok_or(Error::MissingField {
    record: "event",
    field,
  })
}
