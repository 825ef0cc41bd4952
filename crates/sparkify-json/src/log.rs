//! Session log decoding: newline-delimited JSON events.
//!
//! Pipeline:
//!   raw &str
//!     └─ one JSON object per non-blank line
//!          └─ page filter (`NextSong` only)
//!               └─ field validation → ListeningEvent

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sparkify_core::record::{Level, ListeningEvent};

use crate::error::{Error, Result};

/// The only page value that represents a track being played.
pub const NEXT_SONG: &str = "NextSong";

/// The playback events of one log file.
#[derive(Debug, Clone, Default)]
pub struct LogTable {
  pub events:  Vec<ListeningEvent>,
  /// Lines dropped because their page was not [`NEXT_SONG`].
  pub skipped: usize,
}

pub(crate) fn parse_log(input: &str) -> Result<LogTable> {
  let mut table = LogTable::default();

  for (idx, raw) in input.lines().enumerate() {
    let line = idx + 1;
    if raw.trim().is_empty() {
      continue;
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| Error::from_json(idx, &e))?;
    let Value::Object(obj) = value else {
      return Err(Error::malformed(line, "expected a JSON object"));
    };

    if obj.get("page").and_then(Value::as_str) != Some(NEXT_SONG) {
      table.skipped += 1;
      continue;
    }

    table.events.push(Fields { line, obj: &obj }.into_event()?);
  }

  Ok(table)
}

// ─── Field access ────────────────────────────────────────────────────────────

struct Fields<'a> {
  line: usize,
  obj:  &'a Map<String, Value>,
}

impl Fields<'_> {
  fn into_event(self) -> Result<ListeningEvent> {
    let ts_ms = self.int("ts")?;
    let ts = DateTime::<Utc>::from_timestamp_millis(ts_ms)
      .ok_or_else(|| self.bad("ts", format!("timestamp out of range: {ts_ms}")))?;

    let level = self.string("level")?;
    let level: Level = level
      .parse()
      .map_err(|_| self.bad("level", format!("unknown level {level:?}")))?;

    Ok(ListeningEvent {
      ts,
      user_id: self.int("userId")?,
      first_name: self.string("firstName")?,
      last_name: self.string("lastName")?,
      gender: self.opt_string("gender")?,
      level,
      song: self.string("song")?,
      artist: self.string("artist")?,
      length: self.float("length")?,
      session_id: self.int("sessionId")?,
      location: self.opt_string("location")?,
      user_agent: self.opt_string("userAgent")?,
    })
  }

  fn bad(&self, field: &str, reason: impl std::fmt::Display) -> Error {
    Error::malformed(self.line, format!("`{field}`: {reason}"))
  }

  fn required(&self, field: &str) -> Result<&Value> {
    match self.obj.get(field) {
      None | Some(Value::Null) => Err(self.bad(field, "missing")),
      Some(v) => Ok(v),
    }
  }

  fn string(&self, field: &str) -> Result<String> {
    match self.required(field)? {
      Value::String(s) => Ok(s.clone()),
      other => Err(self.bad(field, format!("expected a string, got {other}"))),
    }
  }

  fn opt_string(&self, field: &str) -> Result<Option<String>> {
    match self.obj.get(field) {
      None | Some(Value::Null) => Ok(None),
      Some(Value::String(s)) => Ok(Some(s.clone())),
      Some(other) => Err(self.bad(field, format!("expected a string, got {other}"))),
    }
  }

  /// Integers may arrive as JSON numbers or as numeric strings (`"userId": "10"`).
  fn int(&self, field: &str) -> Result<i64> {
    match self.required(field)? {
      Value::Number(n) => n
        .as_i64()
        .ok_or_else(|| self.bad(field, format!("expected an integer, got {n}"))),
      Value::String(s) => s
        .trim()
        .parse()
        .map_err(|_| self.bad(field, format!("expected an integer, got {s:?}"))),
      other => Err(self.bad(field, format!("expected an integer, got {other}"))),
    }
  }

  fn float(&self, field: &str) -> Result<f64> {
    match self.required(field)? {
      Value::Number(n) => n
        .as_f64()
        .ok_or_else(|| self.bad(field, format!("expected a number, got {n}"))),
      other => Err(self.bad(field, format!("expected a number, got {other}"))),
    }
  }
}
