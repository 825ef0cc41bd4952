//! Dimension and fact row types, and the projections that derive them from
//! parsed records.
//!
//! Projections are pure. Catalog projections never deduplicate (global
//! uniqueness is the loader's job); log projections deduplicate within the
//! batch they are given.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{CatalogRecord, GeoPoint, Level, ListeningEvent};

// ─── Catalog dimensions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRow {
  pub song_id:   String,
  pub title:     String,
  pub artist_id: String,
  pub year:      Option<i32>,
  pub duration:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRow {
  pub artist_id: String,
  pub name:      String,
  pub location:  Option<String>,
  pub geo:       Option<GeoPoint>,
}

/// Project the song half of a catalog record.
pub fn song_row(record: &CatalogRecord) -> SongRow {
  SongRow {
    song_id:   record.song_id.clone(),
    title:     record.title.clone(),
    artist_id: record.artist_id.clone(),
    year:      record.year.filter(|y| *y != 0),
    duration:  record.duration,
  }
}

/// Project the artist half of a catalog record.
pub fn artist_row(record: &CatalogRecord) -> ArtistRow {
  ArtistRow {
    artist_id: record.artist_id.clone(),
    name:      record.artist_name.clone(),
    location:  record
      .artist_location
      .as_deref()
      .map(str::trim)
      .filter(|l| !l.is_empty())
      .map(str::to_owned),
    geo:       record
      .artist_geo
      .and_then(|g| GeoPoint::from_parts(Some(g.latitude), Some(g.longitude))),
  }
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// Calendar breakdown of one event instant. `start_time` is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
  pub start_time: DateTime<Utc>,
  pub hour:       u32,
  pub day:        u32,
  /// ISO-8601 week number.
  pub week:       u32,
  pub month:      u32,
  pub year:       i32,
  /// Monday = 0 through Sunday = 6.
  pub weekday:    u32,
}

impl TimeBucket {
  pub fn from_instant(start_time: DateTime<Utc>) -> Self {
    Self {
      start_time,
      hour: start_time.hour(),
      day: start_time.day(),
      week: start_time.iso_week().week(),
      month: start_time.month(),
      year: start_time.year(),
      weekday: start_time.weekday().num_days_from_monday(),
    }
  }
}

/// One bucket per distinct event instant, in first-seen order.
pub fn time_buckets(events: &[ListeningEvent]) -> Vec<TimeBucket> {
  let mut seen = HashSet::new();
  events
    .iter()
    .filter(|e| seen.insert(e.ts))
    .map(|e| TimeBucket::from_instant(e.ts))
    .collect()
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// The identity tuple used to detect ambiguous user snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserKey {
  pub user_id:    i64,
  pub first_name: String,
  pub last_name:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:    i64,
  pub first_name: String,
  pub last_name:  String,
  pub gender:     Option<String>,
  pub level:      Level,
}

impl UserProfile {
  pub fn key(&self) -> UserKey {
    UserKey {
      user_id:    self.user_id,
      first_name: self.first_name.clone(),
      last_name:  self.last_name.clone(),
    }
  }
}

impl From<&ListeningEvent> for UserProfile {
  fn from(e: &ListeningEvent) -> Self {
    Self {
      user_id:    e.user_id,
      first_name: e.first_name.clone(),
      last_name:  e.last_name.clone(),
      gender:     e.gender.clone(),
      level:      e.level,
    }
  }
}

/// Output of [`user_profiles`].
#[derive(Debug, Clone, Default)]
pub struct UserProjection {
  /// Profiles whose key occurred exactly once in the batch.
  pub profiles: Vec<UserProfile>,
  /// Keys that occurred more than once; none of them are in `profiles`.
  pub excluded: BTreeSet<UserKey>,
}

/// Project user profiles, dropping every key that occurs more than once.
///
/// A repeated key may carry different `level` or `gender` values, and there
/// is no way to tell which snapshot is current, so none of them are kept.
pub fn user_profiles(events: &[ListeningEvent]) -> UserProjection {
  let profiles: Vec<UserProfile> = events.iter().map(UserProfile::from).collect();

  let mut counts: HashMap<UserKey, usize> = HashMap::new();
  for p in &profiles {
    *counts.entry(p.key()).or_default() += 1;
  }

  let excluded: BTreeSet<UserKey> = counts
    .into_iter()
    .filter(|(_, n)| *n > 1)
    .map(|(k, _)| k)
    .collect();

  let profiles = profiles
    .into_iter()
    .filter(|p| !excluded.contains(&p.key()))
    .collect();

  UserProjection { profiles, excluded }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

/// A resolved listening event, ready to append to the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
  pub start_time: DateTime<Utc>,
  pub user_id:    i64,
  pub level:      Level,
  pub song_id:    Option<String>,
  pub artist_id:  Option<String>,
  pub session_id: i64,
  pub location:   Option<String>,
  /// User agent with all `"` characters removed.
  pub user_agent: Option<String>,
}
