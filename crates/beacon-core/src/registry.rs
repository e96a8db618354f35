//! [`AuthorityRegistry`]: the session cache of the authority roster.
//!
//! The roster is fetched at most once per cold start and replaced wholesale
//! on [`AuthorityRegistry::refresh`]. Fetch and parse failures never escape:
//! the registry serves the last good roster, or an empty one if it never had
//! one. An empty roster therefore means "authority data unavailable", not "no
//! authorities exist".
//!
//! Every fetch is tagged with a generation number. When fetches overlap, only
//! the most recently issued one may replace the cache; results of superseded
//! fetches are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::{
  authority::{Authority, parse_roster},
  geo::{BoundingBox, GeoPoint},
  ports::RosterSource,
};

#[derive(Default)]
struct RosterState {
  /// Last successfully parsed roster.
  roster: Option<Arc<[Authority]>>,
  /// Set by `refresh` until a fetch settles.
  stale:  bool,
  /// Generation of the most recently issued fetch.
  issued: u64,
}

pub struct AuthorityRegistry<R> {
  source: R,
  state:  Mutex<RosterState>,
}

impl<R: RosterSource> AuthorityRegistry<R> {
  pub fn new(source: R) -> Self {
    Self { source, state: Mutex::new(RosterState::default()) }
  }

  fn lock(&self) -> MutexGuard<'_, RosterState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// The current roster, fetching it only if no usable copy is cached.
  pub async fn load(&self) -> Arc<[Authority]> {
    let cached = {
      let state = self.lock();
      if state.stale { None } else { state.roster.clone() }
    };
    match cached {
      Some(roster) => roster,
      None => self.fetch().await,
    }
  }

  /// Invalidate the cache and fetch the roster again.
  pub async fn refresh(&self) -> Arc<[Authority]> {
    self.lock().stale = true;
    self.fetch().await
  }

  async fn fetch(&self) -> Arc<[Authority]> {
    let generation = {
      let mut state = self.lock();
      state.issued += 1;
      state.issued
    };
    debug!(generation, "fetching authority roster");

    let outcome = match self.source.fetch_roster().await {
      Ok(raw) => parse_roster(&raw),
      Err(e) => Err(e),
    };

    let mut state = self.lock();
    if generation != state.issued {
      debug!(generation, latest = state.issued, "discarding superseded roster fetch");
      return state.roster.clone().unwrap_or_else(empty_roster);
    }

    match outcome {
      Ok(authorities) => {
        info!(generation, count = authorities.len(), "authority roster loaded");
        let roster: Arc<[Authority]> = authorities.into();
        state.roster = Some(roster.clone());
        state.stale = false;
        roster
      }
      Err(e) => match state.roster.clone() {
        Some(roster) => {
          warn!(error = %e, "authority roster unavailable; serving last good copy");
          state.stale = false;
          roster
        }
        None => {
          warn!(error = %e, "authority roster unavailable and nothing cached");
          empty_roster()
        }
      },
    }
  }

  /// Look up an authority by its unique name.
  pub async fn get(&self, name: &str) -> Option<Authority> {
    self.load().await.iter().find(|a| a.name == name).cloned()
  }

  pub async fn authority_url(&self, name: &str) -> Option<String> {
    self.get(name).await.and_then(|a| a.url)
  }

  pub async fn authority_bounds(&self, name: &str) -> Option<BoundingBox> {
    self.get(name).await.and_then(|a| a.bounds)
  }

  /// Whether the named authority exists, has bounds, and covers `point`.
  pub async fn contains_point(&self, name: &str, point: &GeoPoint) -> bool {
    self.get(name).await.is_some_and(|a| a.covers(point))
  }
}

fn empty_roster() -> Arc<[Authority]> { Arc::from(Vec::new()) }

#[cfg(test)]
mod tests {
  use tokio::sync::Notify;

  use super::*;
  use crate::{
    Result,
    testing::{ALPHA_ROSTER, ScriptedRoster, THREE_ROSTER, point},
  };

  #[tokio::test]
  async fn loads_once_per_session() {
    let source = ScriptedRoster::serving(ALPHA_ROSTER);
    let registry = AuthorityRegistry::new(source.clone());

    assert_eq!(registry.load().await.len(), 1);
    assert_eq!(registry.load().await.len(), 1);
    assert!(registry.get("Alpha").await.is_some());
    assert_eq!(source.fetches(), 1);
  }

  #[tokio::test]
  async fn refresh_replaces_roster() {
    let source = ScriptedRoster::serving(ALPHA_ROSTER);
    source.push_ok(THREE_ROSTER);
    let registry = AuthorityRegistry::new(source.clone());

    assert_eq!(registry.load().await.len(), 1);
    assert_eq!(registry.refresh().await.len(), 3);
    assert_eq!(registry.load().await.len(), 3);
    assert_eq!(source.fetches(), 2);
  }

  #[tokio::test]
  async fn repeated_failure_without_cache_yields_empty() {
    let source = ScriptedRoster::failing();
    let registry = AuthorityRegistry::new(source.clone());

    assert!(registry.load().await.is_empty());
    assert!(registry.load().await.is_empty());
    assert_eq!(source.fetches(), 2);
  }

  #[tokio::test]
  async fn failed_refresh_keeps_last_good_roster() {
    let source = ScriptedRoster::serving(ALPHA_ROSTER);
    source.push_err("timeout");
    let registry = AuthorityRegistry::new(source.clone());

    registry.load().await;
    let after = registry.refresh().await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].name, "Alpha");

    // The fallback copy is served without another network call.
    registry.load().await;
    assert_eq!(source.fetches(), 2);
  }

  #[tokio::test]
  async fn malformed_document_falls_back_like_a_fetch_failure() {
    let source = ScriptedRoster::serving(ALPHA_ROSTER);
    source.push_ok("<html>maintenance</html>");
    let registry = AuthorityRegistry::new(source);

    registry.load().await;
    assert_eq!(registry.refresh().await.len(), 1);
  }

  #[tokio::test]
  async fn lookups_expose_url_and_bounds() {
    let registry =
      AuthorityRegistry::new(ScriptedRoster::serving(THREE_ROSTER));

    assert_eq!(
      registry.authority_url("Beta").await.as_deref(),
      Some("https://beta.example/paths.json")
    );
    assert!(registry.authority_bounds("Alpha").await.is_some());
    assert!(registry.authority_bounds("Gamma").await.is_none());
    assert!(registry.get("Delta").await.is_none());

    assert!(registry.contains_point("Alpha", &point(1.0, 1.0)).await);
    assert!(!registry.contains_point("Beta", &point(1.0, 1.0)).await);
    assert!(!registry.contains_point("Gamma", &point(1.0, 1.0)).await);
  }

  /// The first fetch blocks until the second one has completed.
  struct GatedRoster {
    gate:  Notify,
    calls: Mutex<usize>,
  }

  impl RosterSource for GatedRoster {
    async fn fetch_roster(&self) -> Result<String> {
      let call = {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        *calls
      };
      if call == 1 {
        self.gate.notified().await;
        Ok(ALPHA_ROSTER.to_owned())
      } else {
        Ok(THREE_ROSTER.to_owned())
      }
    }
  }

  #[tokio::test]
  async fn superseded_fetch_is_discarded() {
    let registry = AuthorityRegistry::new(GatedRoster {
      gate:  Notify::new(),
      calls: Mutex::new(0),
    });

    let (first, second) = tokio::join!(registry.refresh(), async {
      let roster = registry.refresh().await;
      registry.source.gate.notify_one();
      roster
    });

    assert_eq!(second.len(), 3);
    // The older result never replaces the newer roster.
    assert_eq!(first.len(), 3);
    assert_eq!(registry.load().await.len(), 3);
  }
}
