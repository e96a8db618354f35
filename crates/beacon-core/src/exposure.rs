//! Potential-exposure evaluation over the rolling per-day counters.
//!
//! The counters are written by an external matching process; this module
//! only reads them, and evaluates whatever window the writer stored.

use tracing::warn;

use crate::{
  ports::{KeyValueStore, StorageKey},
  prefs::Preferences,
};

/// Expected length of the stored exposure window and of the retained
/// location history, in days.
pub const DEFAULT_EXPOSURE_WINDOW_DAYS: usize = 28;

/// Whether any day in `day_bins` recorded at least one exposure event.
pub fn has_potential_exposure(day_bins: &[u32]) -> bool {
  day_bins.iter().any(|&count| count > 0)
}

pub struct ExposureEvaluator<S> {
  prefs:       Preferences<S>,
  window_days: usize,
}

impl<S: KeyValueStore> ExposureEvaluator<S> {
  pub fn new(store: S) -> Self { Self::with_window(store, DEFAULT_EXPOSURE_WINDOW_DAYS) }

  pub fn with_window(store: S, window_days: usize) -> Self {
    Self { prefs: Preferences::new(store), window_days }
  }

  /// The stored counters, as written. Absent or unreadable history is empty.
  /// A window of unexpected length is logged but still evaluated in full.
  pub async fn day_bins(&self) -> Vec<u32> {
    let bins = self.prefs.counters(StorageKey::CrossedPaths).await;
    if !bins.is_empty() && bins.len() != self.window_days {
      warn!(
        stored = bins.len(),
        expected = self.window_days,
        "exposure window has an unexpected length"
      );
    }
    bins
  }

  pub async fn has_potential_exposure(&self) -> bool {
    has_potential_exposure(&self.day_bins().await)
  }
}
