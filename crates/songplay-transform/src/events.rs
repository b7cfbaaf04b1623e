//! Event filter: keep only actual song plays.

use rayon::prelude::*;
use songplay_core::record::EventRecord;

/// Order-preserving subsequence of `events` whose page is `NextSong`.
pub fn filter_plays(events: &[EventRecord]) -> Vec<&EventRecord> {
  events.par_iter().filter(|e| e.is_play()).collect()
}

#[cfg(test)]
mod tests {
  use songplay_core::record::PLAY_PAGE;

  use super::*;

  fn event(page: &str, ts: i64) -> EventRecord {
    EventRecord {
      page: page.into(),
      ts,
      ..Default::default()
    }
  }

  #[test]
  fn keeps_plays_in_order_and_drops_everything_else() {
    let events = [
      event(PLAY_PAGE, 1),
      event("Home", 2),
      event(PLAY_PAGE, 3),
      event("Logout", 4),
      event("NextSongs", 5),
      event(PLAY_PAGE, 6),
    ];
    let plays = filter_plays(&events);
    assert!(plays.iter().all(|e| e.page == PLAY_PAGE));
    let ts: Vec<i64> = plays.iter().map(|e| e.ts).collect();
    assert_eq!(ts, [1, 3, 6]);
  }

  #[test]
  fn empty_log_has_no_plays() {
    assert!(filter_plays(&[]).is_empty());
  }
}
