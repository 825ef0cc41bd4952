//! Fact resolution: matching played tracks against the loaded catalog.
//!
//! The catalog is fetched from the store once and probed locally, so
//! resolving a log file costs one catalog read rather than one query per
//! event. A miss is expected and yields null foreign keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{dimension::FactRow, record::ListeningEvent};

/// Maximum difference, in seconds, between a catalog duration and a reported
/// track length for the two to be considered the same recording.
pub const DURATION_TOLERANCE: f64 = 1e-3;

/// One catalog song as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub title:       String,
  pub artist_name: String,
  pub duration:    f64,
  pub song_id:     String,
  pub artist_id:   String,
}

/// Result of resolving one event. Both halves are `None` on a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMatch {
  pub song_id:   Option<String>,
  pub artist_id: Option<String>,
}

impl SongMatch {
  pub fn is_hit(&self) -> bool { self.song_id.is_some() }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
  pub matched: usize,
  pub missed:  usize,
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// In-memory catalog keyed by `(title, artist name)`.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
  by_name: HashMap<(String, String), Vec<CatalogEntry>>,
  len:     usize,
}

impl CatalogIndex {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, entry: CatalogEntry) {
    self
      .by_name
      .entry((entry.title.clone(), entry.artist_name.clone()))
      .or_default()
      .push(entry);
    self.len += 1;
  }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  /// Find the catalog song matching `(song, artist, length)`.
  ///
  /// Among candidates within [`DURATION_TOLERANCE`], the closest duration
  /// wins; ties go to the lowest song id.
  pub fn resolve(&self, song: &str, artist: &str, length: f64) -> SongMatch {
    let Some(candidates) = self.by_name.get(&(song.to_owned(), artist.to_owned()))
    else {
      return SongMatch::default();
    };

    candidates
      .iter()
      .map(|c| ((c.duration - length).abs(), c))
      .filter(|(delta, _)| *delta <= DURATION_TOLERANCE)
      .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.song_id.cmp(&b.song_id)))
      .map(|(_, c)| SongMatch {
        song_id:   Some(c.song_id.clone()),
        artist_id: Some(c.artist_id.clone()),
      })
      .unwrap_or_default()
  }
}

impl FromIterator<CatalogEntry> for CatalogIndex {
  fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
    let mut index = Self::new();
    for entry in iter {
      index.insert(entry);
    }
    index
  }
}

// ─── Fact rows ───────────────────────────────────────────────────────────────

/// Strip embedded double quotes from a user agent string.
pub fn sanitize_user_agent(agent: &str) -> String { agent.replace('"', "") }

/// Resolve every event into a fact row.
pub fn fact_rows(
  events: &[ListeningEvent],
  index: &CatalogIndex,
) -> (Vec<FactRow>, ResolveStats) {
  let mut stats = ResolveStats::default();

  let rows = events
    .iter()
    .map(|e| {
      let hit = index.resolve(&e.song, &e.artist, e.length);
      if hit.is_hit() {
        stats.matched += 1;
      } else {
        stats.missed += 1;
      }
      FactRow {
        start_time: e.ts,
        user_id:    e.user_id,
        level:      e.level,
        song_id:    hit.song_id,
        artist_id:  hit.artist_id,
        session_id: e.session_id,
        location:   e.location.clone(),
        user_agent: e.user_agent.as_deref().map(sanitize_user_agent),
      }
    })
    .collect();

  (rows, stats)
}
