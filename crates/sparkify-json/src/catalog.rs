//! Catalog file decoding: exactly one JSON object per file.

use serde::Deserialize;
use sparkify_core::record::{CatalogRecord, GeoPoint};

use crate::error::{Error, Result};

/// Wire shape of a catalog object. Derived deserialisation rejects duplicate
/// keys and missing required fields; unknown keys such as `num_songs` are
/// ignored.
#[derive(Deserialize)]
struct RawCatalog {
  song_id:          String,
  title:            String,
  artist_id:        String,
  artist_name:      String,
  artist_location:  Option<String>,
  artist_latitude:  Option<f64>,
  artist_longitude: Option<f64>,
  year:             Option<i32>,
  duration:         f64,
}

pub(crate) fn parse_catalog(input: &str) -> Result<CatalogRecord> {
  let raw: RawCatalog =
    serde_json::from_str(input).map_err(|e| Error::from_json(0, &e))?;

  for (field, value) in [("song_id", &raw.song_id), ("artist_id", &raw.artist_id)] {
    if value.trim().is_empty() {
      return Err(Error::malformed(1, format!("empty `{field}`")));
    }
  }
  if !raw.duration.is_finite() || raw.duration < 0.0 {
    return Err(Error::malformed(1, format!("invalid `duration`: {}", raw.duration)));
  }

  Ok(CatalogRecord {
    song_id:         raw.song_id,
    title:           raw.title,
    artist_id:       raw.artist_id,
    artist_name:     raw.artist_name,
    artist_location: raw.artist_location.filter(|l| !l.trim().is_empty()),
    artist_geo:      GeoPoint::from_parts(raw.artist_latitude, raw.artist_longitude),
    year:            raw.year.filter(|y| *y != 0),
    duration:        raw.duration,
  })
}
