//! Health care authorities and the roster document they are published in.
//!
//! The roster is an external contract, so decoding is defensive: a document
//! that is not a roster at all is an error, but a single malformed entry only
//! loses that entry (or its bounds) and is logged.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
  Error, Result,
  geo::{BoundingBox, GeoPoint},
};

// ─── Authority ───────────────────────────────────────────────────────────────

/// A registered health care authority. `name` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
  pub name:   String,
  /// Where the authority publishes its data.
  pub url:    Option<String>,
  /// The region the authority covers. Authorities without bounds never match
  /// a location.
  pub bounds: Option<BoundingBox>,
}

impl Authority {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), url: None, bounds: None }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.url = Some(url.into());
    self
  }

  pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
    self.bounds = Some(bounds);
    self
  }

  /// Whether the authority's bounds are present and contain `point`.
  pub fn covers(&self, point: &GeoPoint) -> bool {
    self.bounds.as_ref().is_some_and(|b| b.contains(point))
  }
}

// ─── Roster decoding ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawRoster {
  #[serde(rename = "Authorities")]
  authorities: Vec<Value>,
}

/// Decode a roster document.
///
/// The document shape is
/// `{"Authorities": [{"<name>": [{"url": "…"}, {"bounds": {"ne": …, "sw": …}}]}]}`.
/// Property maps may come in any order; unknown properties are ignored.
/// Returns [`Error::Parse`] only when the document as a whole is unusable.
pub fn parse_roster(raw: &str) -> Result<Vec<Authority>> {
  let roster: RawRoster =
    serde_json::from_str(raw).map_err(|e| Error::Parse(e.to_string()))?;

  let mut seen = HashSet::new();
  let mut authorities = Vec::with_capacity(roster.authorities.len());

  for (index, entry) in roster.authorities.into_iter().enumerate() {
    let Some(authority) = parse_entry(index, entry) else { continue };
    if !seen.insert(authority.name.clone()) {
      warn!(name = %authority.name, "duplicate roster entry ignored");
      continue;
    }
    authorities.push(authority);
  }

  Ok(authorities)
}

fn parse_entry(index: usize, entry: Value) -> Option<Authority> {
  let Value::Object(map) = entry else {
    warn!(index, "roster entry is not an object; skipped");
    return None;
  };
  if map.len() != 1 {
    warn!(index, keys = map.len(), "roster entry must have exactly one name; skipped");
    return None;
  }
  let (name, props) = map.into_iter().next()?;
  if name.trim().is_empty() {
    warn!(index, "roster entry has an empty name; skipped");
    return None;
  }
  let Value::Array(props) = props else {
    warn!(%name, "roster entry properties are not a list; skipped");
    return None;
  };

  let mut authority = Authority::new(name);
  for prop in props {
    let Value::Object(prop) = prop else { continue };
    if let Some(url) = prop.get("url").and_then(Value::as_str) {
      authority.url = Some(url.to_owned());
    }
    if let Some(bounds) = prop.get("bounds") {
      authority.bounds = decode_bounds(&authority.name, bounds);
    }
  }
  Some(authority)
}

fn decode_bounds(name: &str, value: &Value) -> Option<BoundingBox> {
  match serde_json::from_value::<BoundingBox>(value.clone()) {
    Ok(bounds) => Some(bounds),
    Err(e) => {
      warn!(%name, error = %e, "unusable authority bounds dropped");
      None
    }
  }
}
