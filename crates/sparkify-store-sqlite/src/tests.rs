//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone, Utc};
use sparkify_core::{
  dimension::{self, FactRow, TimeBucket, UserProfile},
  record::{CatalogRecord, GeoPoint, Level, ListeningEvent},
  resolve,
  store::{CatalogBatch, FailureScope, LogBatch, WarehouseStore},
};

use crate::{Error, SqliteStore, TableCounts};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn record(song_id: &str, title: &str, artist_id: &str, artist: &str, duration: f64) -> CatalogRecord {
  CatalogRecord {
    song_id:         song_id.into(),
    title:           title.into(),
    artist_id:       artist_id.into(),
    artist_name:     artist.into(),
    artist_location: Some("Memphis, TN".into()),
    artist_geo:      Some(GeoPoint { latitude: 35.1, longitude: -90.0 }),
    year:            Some(1999),
    duration,
  }
}

fn play(ts_ms: i64, user_id: i64, level: Level, song: &str, artist: &str, length: f64) -> ListeningEvent {
  ListeningEvent {
    ts: Utc.timestamp_millis_opt(ts_ms).unwrap(),
    user_id,
    first_name: "Ann".into(),
    last_name: "Smith".into(),
    gender: Some("F".into()),
    level,
    song: song.into(),
    artist: artist.into(),
    length,
    session_id: 38,
    location: Some("Springfield".into()),
    user_agent: Some("\"Mozilla/5.0\"".into()),
  }
}

/// Build a log batch the way the pipeline does.
async fn log_batch(s: &SqliteStore, events: &[ListeningEvent]) -> LogBatch {
  let index = s.catalog_index().await.unwrap();
  let (songplays, _) = resolve::fact_rows(events, &index);
  LogBatch {
    time: dimension::time_buckets(events),
    users: dimension::user_profiles(events).profiles,
    songplays,
  }
}

async fn counts(s: &SqliteStore) -> TableCounts { s.table_counts().await.unwrap() }

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn distinct_catalog_files_load_distinct_rows() {
  let s = store().await;

  s.load_catalog(CatalogBatch::from_record(&record("SOA", "Song A", "ARA", "Artist A", 180.5)))
    .await
    .unwrap();
  s.load_catalog(CatalogBatch::from_record(&record("SOB", "Song B", "ARB", "Artist B", 200.0)))
    .await
    .unwrap();

  let c = counts(&s).await;
  assert_eq!((c.songs, c.artists), (2, 2));

  let dupes: i64 = s
    .with_conn(|conn| {
      conn.query_row(
        "SELECT COUNT(*) FROM (SELECT song_id FROM songs GROUP BY song_id HAVING COUNT(*) > 1)",
        [],
        |r| r.get(0),
      )
    })
    .await
    .unwrap();
  assert_eq!(dupes, 0);
}

#[tokio::test]
async fn reloading_catalog_is_first_write_wins() {
  let s = store().await;
  let original = record("SOA", "Song A", "ARA", "Artist A", 180.5);

  let first = s.load_catalog(CatalogBatch::from_record(&original)).await.unwrap();
  assert_eq!(first.written("songs"), 1);
  assert_eq!(first.written("artists"), 1);

  let again = s.load_catalog(CatalogBatch::from_record(&original)).await.unwrap();
  assert_eq!(again.written("songs"), 0);
  assert_eq!(again.written("artists"), 0);

  let mut changed = original.clone();
  changed.title = "Retitled".into();
  changed.artist_name = "Renamed".into();
  s.load_catalog(CatalogBatch::from_record(&changed)).await.unwrap();

  let (title, name): (String, String) = s
    .with_conn(|conn| {
      conn.query_row(
        "SELECT s.title, a.name FROM songs s JOIN artists a USING (artist_id)",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
      )
    })
    .await
    .unwrap();
  assert_eq!(title, "Song A");
  assert_eq!(name, "Artist A");
  assert_eq!(counts(&s).await.songs, 1);
}

#[tokio::test]
async fn zero_year_is_stored_as_null() {
  let s = store().await;
  let mut r = record("SOA", "Song A", "ARA", "Artist A", 180.5);
  r.year = Some(0);
  r.artist_location = None;
  r.artist_geo = None;
  s.load_catalog(CatalogBatch::from_record(&r)).await.unwrap();

  let (year, lat): (Option<i64>, Option<f64>) = s
    .with_conn(|conn| {
      conn.query_row(
        "SELECT s.year, a.latitude FROM songs s JOIN artists a USING (artist_id)",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
      )
    })
    .await
    .unwrap();
  assert_eq!(year, None);
  assert_eq!(lat, None);
}

#[tokio::test]
async fn catalog_index_reflects_loaded_songs() {
  let s = store().await;
  assert!(s.catalog_index().await.unwrap().is_empty());

  s.load_catalog(CatalogBatch::from_record(&record("SOA", "Song A", "ARA", "Artist A", 180.5)))
    .await
    .unwrap();

  let index = s.catalog_index().await.unwrap();
  assert_eq!(index.len(), 1);
  let hit = index.resolve("Song A", "Artist A", 180.5);
  assert_eq!(hit.song_id.as_deref(), Some("SOA"));
  assert_eq!(hit.artist_id.as_deref(), Some("ARA"));
}

// ─── Logs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn log_load_writes_dimensions_and_facts() {
  let s = store().await;
  s.load_catalog(CatalogBatch::from_record(&record("SOA", "Song A", "ARA", "Artist A", 180.5)))
    .await
    .unwrap();

  let events = vec![
    play(1_541_121_934_796, 10, Level::Free, "Song A", "Artist A", 180.5),
    play(1_541_121_934_796, 11, Level::Free, "Unknown Track", "Nobody", 99.0),
    play(1_541_122_000_000, 12, Level::Paid, "Song A", "Artist A", 180.5),
  ];
  let batch = log_batch(&s, &events).await;
  let summary = s.load_log(batch).await.unwrap();

  assert_eq!(summary.written("time"), 2);
  assert_eq!(summary.written("users"), 3);
  assert_eq!(summary.written("songplays"), 3);

  let resolved: Vec<(Option<String>, Option<String>, String)> = s
    .with_conn(|conn| {
      let mut stmt = conn.prepare(
        "SELECT song_id, artist_id, user_agent FROM songplays ORDER BY songplay_id",
      )?;
      stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect()
    })
    .await
    .unwrap();
  assert_eq!(resolved[0].0.as_deref(), Some("SOA"));
  assert_eq!(resolved[0].1.as_deref(), Some("ARA"));
  assert_eq!(resolved[1], (None, None, "Mozilla/5.0".to_string()));
  assert_eq!(resolved[2].0.as_deref(), Some("SOA"));
}

#[tokio::test]
async fn time_rows_use_canonical_keys() {
  let s = store().await;
  let events = vec![play(1_541_121_934_796, 10, Level::Free, "X", "Y", 1.0)];
  s.load_log(log_batch(&s, &events).await).await.unwrap();

  let row: (String, i64, i64, i64, i64, i64, i64) = s
    .with_conn(|conn| {
      conn.query_row(
        "SELECT start_time, hour, day, week, month, year, weekday FROM time",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)),
      )
    })
    .await
    .unwrap();
  assert_eq!(row, ("2018-11-02T01:25:34.796Z".to_string(), 1, 2, 44, 11, 2018, 4));
}

#[tokio::test]
async fn users_are_upserted_across_files() {
  let s = store().await;

  let first = vec![play(1_000, 10, Level::Free, "X", "Y", 1.0)];
  s.load_log(log_batch(&s, &first).await).await.unwrap();

  let second = vec![play(2_000, 10, Level::Paid, "X", "Y", 1.0)];
  s.load_log(log_batch(&s, &second).await).await.unwrap();

  let level: String = s
    .with_conn(|conn| conn.query_row("SELECT level FROM users WHERE user_id = 10", [], |r| r.get(0)))
    .await
    .unwrap();
  assert_eq!(level, "paid");
  assert_eq!(counts(&s).await.users, 1);
  assert_eq!(counts(&s).await.songplays, 2);
}

#[tokio::test]
async fn shared_instant_across_files_keeps_one_time_row() {
  let s = store().await;
  let first = vec![play(5_000, 10, Level::Free, "X", "Y", 1.0)];
  let second = vec![play(5_000, 11, Level::Paid, "X", "Y", 1.0)];

  s.load_log(log_batch(&s, &first).await).await.unwrap();
  s.load_log(log_batch(&s, &second).await).await.unwrap();

  let c = counts(&s).await;
  assert_eq!(c.time, 1);
  assert_eq!(c.songplays, 2);
}

#[tokio::test]
async fn ambiguous_users_never_reach_the_table() {
  let s = store().await;
  let events = vec![
    play(1_000, 10, Level::Free, "X", "Y", 1.0),
    play(2_000, 10, Level::Paid, "X", "Y", 1.0),
  ];
  s.load_log(log_batch(&s, &events).await).await.unwrap();

  let c = counts(&s).await;
  assert_eq!(c.users, 0);
  assert_eq!(c.songplays, 2);
}

// ─── Transactions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_fact_load_rolls_back_dimensions() {
  let s = store().await;
  s.with_conn(|conn| {
    conn.execute_batch(
      "CREATE TRIGGER reject_songplays BEFORE INSERT ON songplays
       BEGIN SELECT RAISE(ABORT, 'songplays rejected'); END;",
    )
  })
  .await
  .unwrap();

  let events = vec![
    play(1_000, 10, Level::Free, "X", "Y", 1.0),
    play(2_000, 11, Level::Free, "X", "Y", 1.0),
  ];
  let err = s.load_log(log_batch(&s, &events).await).await.unwrap_err();

  match &err {
    Error::LoadFailure(f) => {
      assert_eq!(f.table, "songplays");
      assert_eq!(f.row, 0);
      assert!(f.cause.contains("songplays rejected"));
    }
    other => panic!("expected LoadFailure, got {other:?}"),
  }
  assert!(!err.is_run_fatal());
  assert_eq!(counts(&s).await, TableCounts::default());
}

#[tokio::test]
async fn rejected_row_position_is_reported() {
  let s = store().await;
  let ts = Utc.timestamp_millis_opt(1_000).unwrap();
  let fact = |song_id: Option<&str>| FactRow {
    start_time: ts,
    user_id:    10,
    level:      Level::Free,
    song_id:    song_id.map(str::to_owned),
    artist_id:  None,
    session_id: 1,
    location:   None,
    user_agent: None,
  };

  let batch = LogBatch {
    time:      vec![TimeBucket::from_instant(ts)],
    users:     vec![UserProfile {
      user_id:    10,
      first_name: "Ann".into(),
      last_name:  "Smith".into(),
      gender:     None,
      level:      Level::Free,
    }],
    // Row 2 references a song the catalog does not have.
    songplays: vec![fact(None), fact(None), fact(Some("SO-MISSING")), fact(None)],
  };

  let Err(Error::LoadFailure(f)) = s.load_log(batch).await else {
    panic!("expected a LoadFailure");
  };
  assert_eq!(f.table, "songplays");
  assert_eq!(f.row, 2);
  assert_eq!(counts(&s).await, TableCounts::default());
}

#[tokio::test]
async fn later_failure_keeps_earlier_commits() {
  let s = store().await;
  let ok = vec![play(1_000, 10, Level::Free, "X", "Y", 1.0)];
  s.load_log(log_batch(&s, &ok).await).await.unwrap();

  s.with_conn(|conn| {
    conn.execute_batch(
      "CREATE TRIGGER reject_songplays BEFORE INSERT ON songplays
       BEGIN SELECT RAISE(ABORT, 'songplays rejected'); END;",
    )
  })
  .await
  .unwrap();

  let bad = vec![play(2_000, 11, Level::Free, "X", "Y", 1.0)];
  assert!(s.load_log(log_batch(&s, &bad).await).await.is_err());

  let c = counts(&s).await;
  assert_eq!((c.time, c.users, c.songplays), (1, 1, 1));
}

#[tokio::test]
async fn closed_store_reports_fatal_error() {
  let s = store().await;
  let handle = s.clone();
  s.close().await.unwrap();

  let err = handle.table_counts().await.unwrap_err();
  assert!(err.is_run_fatal());
}
