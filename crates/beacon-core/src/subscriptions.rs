//! [`SubscriptionTracker`] tracks the user's authority subscriptions and
//! makes the "new authorities in your area" decision.
//!
//! The tracker is the only writer of the subscription set.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::{
  Result,
  authority::Authority,
  geo::GeoPoint,
  matcher::match_point,
  ports::{KeyValueStore, LocationHistory, Notification, Notifier, RosterSource, StorageKey},
  prefs::Preferences,
  registry::AuthorityRegistry,
};

/// The authorities in `matched` whose names are not in `subscribed`.
pub fn newly_relevant(
  matched: &[Authority],
  subscribed: &BTreeSet<String>,
) -> Vec<Authority> {
  matched
    .iter()
    .filter(|a| !subscribed.contains(&a.name))
    .cloned()
    .collect()
}

pub struct SubscriptionTracker<S> {
  prefs: Preferences<S>,
}

impl<S: KeyValueStore> SubscriptionTracker<S> {
  pub fn new(store: S) -> Self { Self { prefs: Preferences::new(store) } }

  /// Names of the subscribed authorities. Unreadable storage reads as empty.
  pub async fn subscribed_names(&self) -> BTreeSet<String> {
    self.prefs.names(StorageKey::AuthoritySubscriptions).await
  }

  pub async fn has_any_subscription(&self) -> bool {
    !self.subscribed_names().await.is_empty()
  }

  /// Add `name` to the subscription set. Returns whether the set changed;
  /// subscribing twice writes nothing the second time.
  pub async fn subscribe(&self, name: &str) -> Result<bool> {
    let mut names = self.subscribed_names().await;
    if !names.insert(name.to_owned()) {
      return Ok(false);
    }
    self.prefs.set_names(StorageKey::AuthoritySubscriptions, &names).await?;
    info!(%name, "subscribed to authority");
    Ok(true)
  }

  /// Remove `name` from the subscription set. Returns whether the set changed.
  pub async fn unsubscribe(&self, name: &str) -> Result<bool> {
    let mut names = self.subscribed_names().await;
    if !names.remove(name) {
      return Ok(false);
    }
    self.prefs.set_names(StorageKey::AuthoritySubscriptions, &names).await?;
    info!(%name, "unsubscribed from authority");
    Ok(true)
  }

  /// Authorities covering `point` that the user has not subscribed to. When
  /// there are any, one notification citing their count is emitted.
  pub async fn should_notify_new_authorities<R, N>(
    &self,
    point: &GeoPoint,
    registry: &AuthorityRegistry<R>,
    notifier: &N,
  ) -> Vec<Authority>
  where
    R: RosterSource,
    N: Notifier,
  {
    let matched = match_point(point, &registry.load().await);
    let fresh = newly_relevant(&matched, &self.subscribed_names().await);
    if fresh.is_empty() {
      debug!(matched = matched.len(), "no new authorities at current location");
    } else {
      info!(count = fresh.len(), "new authorities at current location");
      notifier.notify(&Notification::NewAuthoritiesInArea { count: fresh.len() });
    }
    fresh
  }

  /// [`Self::should_notify_new_authorities`] at the most recent recorded
  /// location. Does nothing if no location has been recorded.
  pub async fn find_new_authorities<L, R, N>(
    &self,
    locations: &L,
    registry: &AuthorityRegistry<R>,
    notifier: &N,
  ) -> Result<Vec<Authority>>
  where
    L: LocationHistory,
    R: RosterSource,
    N: Notifier,
  {
    match locations.most_recent_location().await? {
      Some(point) => Ok(
        self
          .should_notify_new_authorities(&point, registry, notifier)
          .await,
      ),
      None => Ok(Vec::new()),
    }
  }

  // ── Auto-subscription preference ──────────────────────────────────────────

  /// Whether the user has answered the auto-subscription prompt either way.
  pub async fn has_set_auto_subscription(&self) -> bool {
    self.prefs.flag_if_set(StorageKey::AutoSubscription).await.is_some()
  }

  pub async fn is_auto_subscription_enabled(&self) -> bool {
    self.prefs.flag(StorageKey::AutoSubscription).await
  }

  pub async fn set_auto_subscription(&self, enabled: bool) -> Result<()> {
    self.prefs.set_flag(StorageKey::AutoSubscription, enabled).await
  }
}
