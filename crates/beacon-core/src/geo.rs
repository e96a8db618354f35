//! Geographic primitives: points, axis-aligned bounding boxes and recorded
//! locations.
//!
//! All coordinates are decimal degrees (WGS 84). Bounding boxes do not wrap
//! around the antimeridian: a box whose south-west longitude is greater than
//! its north-east longitude contains no point at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── GeoPoint ────────────────────────────────────────────────────────────────

/// A position on the globe. Deserialisation goes through [`GeoPoint::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
  pub latitude:  f64,
  pub longitude: f64,
}

impl GeoPoint {
  /// Build a point, rejecting coordinates outside `[-90, 90]` × `[-180, 180]`
  /// (and NaN).
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    if !(-90.0..=90.0).contains(&latitude)
      || !(-180.0..=180.0).contains(&longitude)
    {
      return Err(Error::InvalidCoordinate { latitude, longitude });
    }
    Ok(Self { latitude, longitude })
  }
}

#[derive(Deserialize)]
struct RawGeoPoint {
  latitude:  f64,
  longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
  type Error = Error;

  fn try_from(raw: RawGeoPoint) -> Result<Self> { Self::new(raw.latitude, raw.longitude) }
}

// ─── BoundingBox ─────────────────────────────────────────────────────────────

/// An axis-aligned rectangle given by its north-east and south-west corners.
/// Deserialisation goes through [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBoundingBox")]
pub struct BoundingBox {
  #[serde(rename = "ne")]
  pub northeast: GeoPoint,
  #[serde(rename = "sw")]
  pub southwest: GeoPoint,
}

impl BoundingBox {
  /// Build a box, requiring `northeast.latitude >= southwest.latitude`.
  ///
  /// Longitude order is not checked; see the module docs.
  pub fn new(northeast: GeoPoint, southwest: GeoPoint) -> Result<Self> {
    if northeast.latitude < southwest.latitude {
      return Err(Error::InvalidBounds);
    }
    Ok(Self { northeast, southwest })
  }

  pub fn contains(&self, point: &GeoPoint) -> bool { contains(point, self) }
}

#[derive(Deserialize)]
struct RawBoundingBox {
  ne: GeoPoint,
  sw: GeoPoint,
}

impl TryFrom<RawBoundingBox> for BoundingBox {
  type Error = Error;

  fn try_from(raw: RawBoundingBox) -> Result<Self> { Self::new(raw.ne, raw.sw) }
}

/// Inclusive point-in-rectangle test.
///
/// True iff the point's latitude lies in `[sw.lat, ne.lat]` and its longitude
/// in `[sw.lon, ne.lon]`.
pub fn contains(point: &GeoPoint, bounds: &BoundingBox) -> bool {
  let lat = bounds.southwest.latitude..=bounds.northeast.latitude;
  let lon = bounds.southwest.longitude..=bounds.northeast.longitude;
  lat.contains(&point.latitude) && lon.contains(&point.longitude)
}

// ─── LocationRecord ──────────────────────────────────────────────────────────

/// A single point of the user's location trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
  pub point:       GeoPoint,
  /// When the capture service recorded the point.
  pub recorded_at: DateTime<Utc>,
}
