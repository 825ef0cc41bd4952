//! Typed input records, one per source-file shape.
//!
//! A [`CatalogRecord`] is the single song/artist pair held in a catalog file.
//! A [`ListeningEvent`] is one `NextSong` line from a session log. Both are
//! validated by the parser; nothing downstream re-checks required fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// An artist's coordinates. Only present when both halves were supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub latitude:  f64,
  pub longitude: f64,
}

impl GeoPoint {
  /// Pair up two optional coordinates, dropping the pair if either half is
  /// missing or not a finite number.
  pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
    match (latitude, longitude) {
      (Some(latitude), Some(longitude))
        if latitude.is_finite() && longitude.is_finite() =>
      {
        Some(Self { latitude, longitude })
      }
      _ => None,
    }
  }
}

/// One song and its artist, as described by a catalog file.
///
/// `song_id` and `artist_id` are globally unique across the catalog. A zero
/// year is never represented: unknown years are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
  pub song_id:         String,
  pub title:           String,
  pub artist_id:       String,
  pub artist_name:     String,
  pub artist_location: Option<String>,
  pub artist_geo:      Option<GeoPoint>,
  pub year:            Option<i32>,
  /// Track length in seconds, full precision.
  pub duration:        f64,
}

// ─── Session log ─────────────────────────────────────────────────────────────

/// Subscription level of a user at the time of an event.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
  Free,
  Paid,
}

/// A single "track played" event from a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningEvent {
  pub ts:         DateTime<Utc>,
  pub user_id:    i64,
  pub first_name: String,
  pub last_name:  String,
  pub gender:     Option<String>,
  pub level:      Level,
  /// Track title as reported by the client.
  pub song:       String,
  pub artist:     String,
  /// Track length in seconds as reported by the client.
  pub length:     f64,
  pub session_id: i64,
  pub location:   Option<String>,
  /// Raw user agent; may still contain quote characters.
  pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn level_string_forms() {
    assert_eq!(Level::Free.as_ref(), "free");
    assert_eq!("paid".parse::<Level>().unwrap(), Level::Paid);
    assert!("premium".parse::<Level>().is_err());
  }

  #[test]
  fn geo_point_needs_both_halves() {
    assert!(GeoPoint::from_parts(Some(35.1), None).is_none());
    assert!(GeoPoint::from_parts(None, Some(-90.0)).is_none());
    assert!(GeoPoint::from_parts(Some(f64::NAN), Some(-90.0)).is_none());
    assert_eq!(
      GeoPoint::from_parts(Some(35.1), Some(-90.0)),
      Some(GeoPoint { latitude: 35.1, longitude: -90.0 })
    );
  }
}
