//! Collaborator traits: everything the core consumes but does not own.
//!
//! Network retrieval, persistence, the OS location service, and notification
//! delivery are implemented outside this crate (e.g. `beacon-store-sqlite`,
//! the `beacon` binary). The core components are generic over these traits so
//! tests can substitute in-memory fakes.
//!
//! All methods return `Send` futures so components can be driven from a
//! multi-threaded tokio runtime.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Result,
  geo::{GeoPoint, LocationRecord},
};

// ─── Roster ──────────────────────────────────────────────────────────────────

/// Source of the raw authority roster document.
pub trait RosterSource: Send + Sync {
  /// Retrieve the roster document. Transport failures are [`crate::Error::Fetch`].
  fn fetch_roster(&self) -> impl Future<Output = Result<String>> + Send + '_;
}

// ─── Key-value persistence ───────────────────────────────────────────────────

/// The fixed set of persisted keys the core reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
  /// Whether the user consented to location tracking (`bool`).
  Participating,
  /// Names of the authorities the user subscribed to (`[string]`).
  AuthoritySubscriptions,
  /// Whether new authorities in the area should be subscribed automatically
  /// (`bool`, absent until the user chooses).
  AutoSubscription,
  /// Rolling per-day exposure counters, oldest first (`[u32]`).
  CrossedPaths,
}

impl StorageKey {
  /// The key under which the value is persisted.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Participating => "PARTICIPATE",
      Self::AuthoritySubscriptions => "AUTHORITY_SOURCE_SETTINGS",
      Self::AutoSubscription => "HCA_AUTO_SUBSCRIPTION",
      Self::CrossedPaths => "CROSSED_PATHS",
    }
  }
}

/// A persisted key-value store holding typed JSON values.
///
/// Implementations are responsible for presenting typed values: legacy
/// encodings (such as booleans stored as `"true"` strings) must be normalised
/// at this boundary. Failures are [`crate::Error::Storage`].
pub trait KeyValueStore: Send + Sync {
  fn get_value(
    &self,
    key: StorageKey,
  ) -> impl Future<Output = Result<Option<Value>>> + Send + '_;

  fn set_value(
    &self,
    key: StorageKey,
    value: Value,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}

// ─── Location history ────────────────────────────────────────────────────────

/// Read access to the location trail recorded by the capture service.
pub trait LocationHistory: Send + Sync {
  /// All retained records, oldest first.
  fn location_history(
    &self,
  ) -> impl Future<Output = Result<Vec<LocationRecord>>> + Send + '_;

  /// The newest recorded point, if any. This is the user's current location as far
  /// as the core is concerned.
  fn most_recent_location(
    &self,
  ) -> impl Future<Output = Result<Option<GeoPoint>>> + Send + '_;
}

// ─── OS location service ─────────────────────────────────────────────────────

/// Snapshot of the OS location service as reported by the capture service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsLocationStatus {
  pub authorized:       bool,
  pub services_enabled: bool,
  pub is_running:       bool,
}

/// The background location-capture service.
///
/// `start` and `stop` must be idempotent: the state machine may issue them
/// redundantly when reconciliations race.
pub trait LocationTracker: Send + Sync {
  fn query_status(
    &self,
  ) -> impl Future<Output = Result<OsLocationStatus>> + Send + '_;

  fn start(&self) -> impl Future<Output = Result<()>> + Send + '_;

  fn stop(&self) -> impl Future<Output = Result<()>> + Send + '_;
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// A user-facing notification the core asks to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
  /// Authorities cover the current location that the user has not subscribed
  /// to yet.
  NewAuthoritiesInArea { count: usize },
  /// Location tracking was stopped.
  LocationDisabled,
}

impl Notification {
  /// Default English title; delivery layers may localise instead.
  pub fn title(&self) -> &'static str {
    match self {
      Self::NewAuthoritiesInArea { .. } => "New Health Authorities in your area",
      Self::LocationDisabled => "Location tracking is off",
    }
  }

  pub fn body(&self) -> String {
    match self {
      Self::NewAuthoritiesInArea { count: 1 } => {
        "There is 1 health authority available in your current location."
          .to_owned()
      }
      Self::NewAuthoritiesInArea { count } => format!(
        "There are {count} health authorities available in your current location."
      ),
      Self::LocationDisabled => {
        "Turn location back on to keep your location trail up to date."
          .to_owned()
      }
    }
  }
}

/// Fire-and-forget notification dispatch.
pub trait Notifier: Send + Sync {
  fn notify(&self, notification: &Notification);
}
