//! Encoding helpers between Rust domain types and the plain SQLite column
//! values the loader binds.
//!
//! Timestamps are stored as RFC 3339 strings with millisecond precision so
//! that equal instants always produce equal keys. Levels are stored as their
//! lowercase names.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use sparkify_core::{
  dimension::{ArtistRow, FactRow, SongRow, TimeBucket, UserProfile},
  record::Level,
};

use crate::loader::TableRow;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn encode_level(level: Level) -> String { level.as_ref().to_owned() }

// ─── Rows ────────────────────────────────────────────────────────────────────
// Value order must match the column order of the matching `TableSpec`.

impl TableRow for ArtistRow {
  fn values(&self) -> Vec<Value> {
    vec![
      self.artist_id.clone().into(),
      self.name.clone().into(),
      self.location.clone().into(),
      self.geo.map(|g| g.latitude).into(),
      self.geo.map(|g| g.longitude).into(),
    ]
  }
}

impl TableRow for SongRow {
  fn values(&self) -> Vec<Value> {
    vec![
      self.song_id.clone().into(),
      self.title.clone().into(),
      self.artist_id.clone().into(),
      self.year.filter(|y| *y != 0).into(),
      self.duration.into(),
    ]
  }
}

impl TableRow for UserProfile {
  fn values(&self) -> Vec<Value> {
    vec![
      self.user_id.into(),
      self.first_name.clone().into(),
      self.last_name.clone().into(),
      self.gender.clone().into(),
      encode_level(self.level).into(),
    ]
  }
}

impl TableRow for TimeBucket {
  fn values(&self) -> Vec<Value> {
    vec![
      encode_dt(self.start_time).into(),
      self.hour.into(),
      self.day.into(),
      self.week.into(),
      self.month.into(),
      self.year.into(),
      self.weekday.into(),
    ]
  }
}

impl TableRow for FactRow {
  fn values(&self) -> Vec<Value> {
    vec![
      encode_dt(self.start_time).into(),
      self.user_id.into(),
      encode_level(self.level).into(),
      self.song_id.clone().into(),
      self.artist_id.clone().into(),
      self.session_id.into(),
      self.location.clone().into(),
      self.user_agent.clone().into(),
    ]
  }
}
