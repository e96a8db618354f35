//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC strings, so lexical order in SQL
//! is chronological order. Preference values are compact JSON.

use beacon_core::geo::{GeoPoint, LocationRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Preference values ───────────────────────────────────────────────────────

pub fn encode_value(value: &Value) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

/// Decode a stored value, normalising legacy encodings.
///
/// Older clients stored booleans as the strings `"true"` / `"false"`, either
/// bare or JSON-quoted. Both come back as real booleans.
pub fn decode_value(s: &str) -> Result<Value> {
  match s.trim() {
    "true" | "\"true\"" => Ok(Value::Bool(true)),
    "false" | "\"false\"" => Ok(Value::Bool(false)),
    other => Ok(serde_json::from_str(other)?),
  }
}

// ─── Raw row structs ─────────────────────────────────────────────────────────

/// Raw column values for a `locations` row.
pub struct RawLocation {
  pub latitude:    f64,
  pub longitude:   f64,
  pub recorded_at: String,
}

impl RawLocation {
  pub fn into_record(self) -> Result<LocationRecord> {
    Ok(LocationRecord {
      point:       GeoPoint::new(self.latitude, self.longitude)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
