//! Matching locations against authority bounds.
//!
//! Results keep roster order. Authorities without bounds never match.

use crate::{
  Result,
  authority::Authority,
  geo::GeoPoint,
  ports::{LocationHistory, RosterSource},
  registry::AuthorityRegistry,
};

/// Every authority whose bounds contain `point`.
pub fn match_point(point: &GeoPoint, authorities: &[Authority]) -> Vec<Authority> {
  authorities.iter().filter(|a| a.covers(point)).cloned().collect()
}

/// Every authority whose bounds contain at least one of `points`.
pub fn match_history<'a>(
  points: impl IntoIterator<Item = &'a GeoPoint>,
  authorities: &[Authority],
) -> Vec<Authority> {
  let mut matched = vec![false; authorities.len()];
  let mut remaining = authorities.iter().filter(|a| a.bounds.is_some()).count();

  for point in points {
    if remaining == 0 {
      break;
    }
    for (hit, authority) in matched.iter_mut().zip(authorities) {
      if !*hit && authority.covers(point) {
        *hit = true;
        remaining -= 1;
      }
    }
  }

  authorities
    .iter()
    .zip(matched)
    .filter_map(|(a, hit)| hit.then(|| a.clone()))
    .collect()
}

/// Authorities covering the most recent recorded location. Empty when no
/// location has been recorded yet.
pub async fn authorities_in_current_location<L, R>(
  locations: &L,
  registry: &AuthorityRegistry<R>,
) -> Result<Vec<Authority>>
where
  L: LocationHistory,
  R: RosterSource,
{
  let Some(point) = locations.most_recent_location().await? else {
    return Ok(Vec::new());
  };
  Ok(match_point(&point, &registry.load().await))
}

/// Authorities covering any point of the retained location history.
pub async fn authorities_in_history<L, R>(
  locations: &L,
  registry: &AuthorityRegistry<R>,
) -> Result<Vec<Authority>>
where
  L: LocationHistory,
  R: RosterSource,
{
  let history = locations.location_history().await?;
  let roster = registry.load().await;
  Ok(match_history(history.iter().map(|r| &r.point), &roster))
}
