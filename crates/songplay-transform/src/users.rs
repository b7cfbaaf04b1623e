//! User extractor: plays → `users` dimension, one row per `user_id`.
//!
//! A user's level changes over time, so each user resolves to the play with
//! the greatest `ts` (last write wins). Plays sharing that `ts` are ordered by
//! level (`paid` over `free`) and then by name and gender, which makes the
//! result independent of the order events arrive in.

use std::collections::{HashMap, hash_map::Entry};

use songplay_core::{
  record::{EventRecord, Level},
  table::UserDim,
};

use crate::Result;

/// Total order used to pick a user's authoritative play; greatest wins.
type Recency<'a> = (i64, Level, Option<&'a str>, Option<&'a str>, Option<&'a str>);

fn recency(event: &EventRecord, level: Level) -> Recency<'_> {
  (
    event.ts,
    level,
    event.first_name.as_deref(),
    event.last_name.as_deref(),
    event.gender.as_deref(),
  )
}

/// Build the `users` table, sorted by `user_id`.
///
/// Every play must carry a `userId` and a `level`.
pub fn extract_users(plays: &[&EventRecord]) -> Result<Vec<UserDim>> {
  let mut latest: HashMap<&str, (&EventRecord, Level)> = HashMap::new();

  for &event in plays {
    let user_id = event.require_user_id()?;
    let level = event.require_level()?;

    match latest.entry(user_id) {
      Entry::Vacant(slot) => {
        slot.insert((event, level));
      }
      Entry::Occupied(mut slot) => {
        let (current, current_level) = *slot.get();
        if recency(event, level) > recency(current, current_level) {
          slot.insert((event, level));
        }
      }
    }
  }

  let mut users: Vec<UserDim> = latest
    .into_iter()
    .map(|(user_id, (event, level))| UserDim {
      user_id: user_id.to_owned(),
      first_name: event.first_name.clone(),
      last_name: event.last_name.clone(),
      gender: event.gender.clone(),
      level,
    })
    .collect();
  users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
  Ok(users)
}

#[cfg(test)]
mod tests {
  use songplay_core::record::PLAY_PAGE;

  use super::*;

  fn play(user_id: &str, level: Level, ts: i64) -> EventRecord {
    EventRecord {
      user_id: Some(user_id.into()),
      first_name: Some("Lily".into()),
      last_name: Some("Koch".into()),
      gender: Some("F".into()),
      level: Some(level),
      page: PLAY_PAGE.into(),
      ts,
      ..Default::default()
    }
  }

  fn extract(events: &[EventRecord]) -> Vec<UserDim> {
    let plays: Vec<&EventRecord> = events.iter().collect();
    extract_users(&plays).unwrap()
  }

  #[test]
  fn one_row_per_user_sorted_by_id() {
    let users = extract(&[
      play("15", Level::Paid, 1),
      play("10", Level::Free, 2),
      play("15", Level::Paid, 3),
    ]);
    let ids: Vec<_> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, ["10", "15"]);
  }

  #[test]
  fn latest_ts_determines_level() {
    // Upgrade observed last in the log but earlier in time.
    let users = extract(&[
      play("7", Level::Free, 2_000),
      play("7", Level::Paid, 1_000),
    ]);
    assert_eq!(users[0].level, Level::Free);

    let users = extract(&[
      play("7", Level::Paid, 1_000),
      play("7", Level::Free, 3_000),
      play("7", Level::Paid, 2_000),
    ]);
    assert_eq!(users[0].level, Level::Free);
  }

  #[test]
  fn same_instant_prefers_paid() {
    let a = extract(&[play("7", Level::Free, 5), play("7", Level::Paid, 5)]);
    let b = extract(&[play("7", Level::Paid, 5), play("7", Level::Free, 5)]);
    assert_eq!(a[0].level, Level::Paid);
    assert_eq!(a, b);
  }

  #[test]
  fn winner_supplies_all_columns() {
    let mut renamed = play("7", Level::Paid, 10);
    renamed.last_name = Some("Smith".into());
    let users = extract(&[play("7", Level::Free, 1), renamed]);
    assert_eq!(users[0].last_name.as_deref(), Some("Smith"));
    assert_eq!(users[0].level, Level::Paid);
  }

  #[test]
  fn rerun_is_identical() {
    let events = [
      play("3", Level::Free, 9),
      play("1", Level::Paid, 4),
      play("3", Level::Paid, 9),
      play("1", Level::Free, 8),
    ];
    let mut reversed = events.clone();
    reversed.reverse();
    assert_eq!(extract(&events), extract(&events));
    assert_eq!(extract(&events), extract(&reversed));
  }

  #[test]
  fn play_without_user_fails() {
    let mut anonymous = play("7", Level::Free, 1);
    anonymous.user_id = None;
    let plays = vec![&anonymous];
    assert!(extract_users(&plays).is_err());
  }
}
