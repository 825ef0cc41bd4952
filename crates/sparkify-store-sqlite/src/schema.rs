//! SQL schema and per-table write contract for the Sparkify star schema.
//!
//! The DDL runs once at connection startup. Column lists below must stay in
//! the same order as the values produced by the row encoders in `encode.rs`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS artists (
    artist_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    location   TEXT,
    latitude   REAL,
    longitude  REAL
);

-- Catalog rows are first-write-wins; nothing ever updates them.
CREATE TABLE IF NOT EXISTS songs (
    song_id    TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    artist_id  TEXT NOT NULL REFERENCES artists(artist_id),
    year       INTEGER CHECK (year IS NULL OR year <> 0),
    duration   REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    gender      TEXT,
    level       TEXT NOT NULL CHECK (level IN ('free', 'paid'))
);

CREATE TABLE IF NOT EXISTS time (
    start_time  TEXT PRIMARY KEY,   -- RFC 3339 UTC, millisecond precision
    hour        INTEGER NOT NULL,
    day         INTEGER NOT NULL,
    week        INTEGER NOT NULL,
    month       INTEGER NOT NULL,
    year        INTEGER NOT NULL,
    weekday     INTEGER NOT NULL    -- Monday = 0
);

-- Facts are append-only. user_id has no foreign key: ambiguous users are
-- withheld from `users` on purpose.
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time   TEXT NOT NULL REFERENCES time(start_time),
    user_id      INTEGER NOT NULL,
    level        TEXT NOT NULL CHECK (level IN ('free', 'paid')),
    song_id      TEXT REFERENCES songs(song_id),
    artist_id    TEXT REFERENCES artists(artist_id),
    session_id   INTEGER NOT NULL,
    location     TEXT,
    user_agent   TEXT
);

CREATE INDEX IF NOT EXISTS songs_match_idx      ON songs(title, duration);
CREATE INDEX IF NOT EXISTS songplays_start_idx  ON songplays(start_time);
CREATE INDEX IF NOT EXISTS songplays_user_idx   ON songplays(user_id);

PRAGMA user_version = 1;
";

// ─── Write contract ──────────────────────────────────────────────────────────

/// What to do when an incoming row collides with an existing primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
  /// Keep the stored row (`ON CONFLICT DO NOTHING`).
  Ignore,
  /// Replace the stored row's non-key columns with the incoming values.
  Overwrite,
  /// No conflict target; every row is a new row.
  Append,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub name:     &'static str,
  pub nullable: bool,
}

const fn col(name: &'static str) -> Column { Column { name, nullable: false } }

const fn nullable(name: &'static str) -> Column { Column { name, nullable: true } }

/// A target table as seen by the batch loader.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
  pub name:     &'static str,
  pub columns:  &'static [Column],
  /// Primary-key columns; the conflict target for `Ignore`/`Overwrite`.
  pub key:      &'static [&'static str],
  pub conflict: ConflictPolicy,
}

pub const ARTISTS: TableSpec = TableSpec {
  name:     "artists",
  columns:  &[
    col("artist_id"),
    col("name"),
    nullable("location"),
    nullable("latitude"),
    nullable("longitude"),
  ],
  key:      &["artist_id"],
  conflict: ConflictPolicy::Ignore,
};

pub const SONGS: TableSpec = TableSpec {
  name:     "songs",
  columns:  &[
    col("song_id"),
    col("title"),
    col("artist_id"),
    nullable("year"),
    col("duration"),
  ],
  key:      &["song_id"],
  conflict: ConflictPolicy::Ignore,
};

pub const USERS: TableSpec = TableSpec {
  name:     "users",
  columns:  &[
    col("user_id"),
    col("first_name"),
    col("last_name"),
    nullable("gender"),
    col("level"),
  ],
  key:      &["user_id"],
  conflict: ConflictPolicy::Overwrite,
};

pub const TIME: TableSpec = TableSpec {
  name:     "time",
  columns:  &[
    col("start_time"),
    col("hour"),
    col("day"),
    col("week"),
    col("month"),
    col("year"),
    col("weekday"),
  ],
  key:      &["start_time"],
  conflict: ConflictPolicy::Overwrite,
};

pub const SONGPLAYS: TableSpec = TableSpec {
  name:     "songplays",
  columns:  &[
    col("start_time"),
    col("user_id"),
    col("level"),
    nullable("song_id"),
    nullable("artist_id"),
    col("session_id"),
    nullable("location"),
    nullable("user_agent"),
  ],
  key:      &[],
  conflict: ConflictPolicy::Append,
};
