//! Location-tracking state machine.
//!
//! The decision is a pure function of consent and OS signals ([`decide`]);
//! reconciliation compares the decided target with the reported running
//! state and issues at most one command per evaluation ([`reconcile`]).
//! [`TrackingStateMachine`] wires both to the collaborators.
//!
//! A failed OS status query leaves tracking untouched: a transient glitch must
//! never stop a running capture service. Every evaluation is tagged with a
//! generation number, and an evaluation overtaken by a newer one reports its
//! status but issues no command.

use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  Result,
  exposure::ExposureEvaluator,
  ports::{KeyValueStore, LocationTracker, Notification, Notifier, StorageKey},
  prefs::Preferences,
};

/// Interval the capture service should use between location polls.
pub const LOCATION_UPDATE_INTERVAL: Duration = Duration::from_secs(5 * 60);

// ─── Decision ────────────────────────────────────────────────────────────────

/// Why tracking can or cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingReason {
  None,
  LocationOff,
  NotAuthorized,
  UserOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
  Stopped,
  Running,
}

/// The signals one evaluation is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingInputs {
  pub user_opted_in:    bool,
  pub services_enabled: bool,
  pub authorized:       bool,
}

/// First matching rule wins: consent, then OS services, then authorisation.
pub fn decide(inputs: &TrackingInputs) -> (TrackingState, TrackingReason) {
  if !inputs.user_opted_in {
    (TrackingState::Stopped, TrackingReason::UserOff)
  } else if !inputs.services_enabled {
    (TrackingState::Stopped, TrackingReason::LocationOff)
  } else if !inputs.authorized {
    (TrackingState::Stopped, TrackingReason::NotAuthorized)
  } else {
    (TrackingState::Running, TrackingReason::None)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingCommand {
  Start,
  Stop,
}

/// The command that moves a service in `is_running` state to `target`, if
/// any.
pub fn reconcile(is_running: bool, target: TrackingState) -> Option<TrackingCommand> {
  match (target, is_running) {
    (TrackingState::Running, false) => Some(TrackingCommand::Start),
    (TrackingState::Stopped, true) => Some(TrackingCommand::Stop),
    _ => None,
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Derived tracking status; recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStatus {
  pub can_track:              bool,
  pub reason:                 TrackingReason,
  pub has_potential_exposure: bool,
  pub is_running:             bool,
}

impl TrackingStatus {
  pub fn target(&self) -> TrackingState {
    if self.can_track { TrackingState::Running } else { TrackingState::Stopped }
  }
}

/// Result of one status evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusCheck {
  Available(TrackingStatus),
  /// The OS status query failed; the running state is unknown and was left
  /// alone.
  Unavailable {
    has_potential_exposure: bool,
    error:                  String,
  },
}

impl StatusCheck {
  pub fn can_track(&self) -> bool {
    matches!(self, Self::Available(status) if status.can_track)
  }

  pub fn has_potential_exposure(&self) -> bool {
    match self {
      Self::Available(status) => status.has_potential_exposure,
      Self::Unavailable { has_potential_exposure, .. } => *has_potential_exposure,
    }
  }
}

// ─── State machine ───────────────────────────────────────────────────────────

pub struct TrackingStateMachine<S, T, N> {
  prefs:    Preferences<S>,
  exposure: ExposureEvaluator<S>,
  tracker:  T,
  notifier: N,
  /// Generation of the most recently issued status query.
  issued:   AtomicU64,
}

impl<S, T, N> TrackingStateMachine<S, T, N>
where
  S: KeyValueStore + Clone,
  T: LocationTracker,
  N: Notifier,
{
  pub fn new(store: S, tracker: T, notifier: N) -> Self {
    Self {
      prefs: Preferences::new(store.clone()),
      exposure: ExposureEvaluator::new(store),
      tracker,
      notifier,
      issued: AtomicU64::new(0),
    }
  }

  /// Whether the user has consented to tracking. Unreadable consent reads as
  /// opted out.
  pub async fn is_opted_in(&self) -> bool {
    self.prefs.flag(StorageKey::Participating).await
  }

  /// Evaluate the current status without issuing any command. Queries the OS
  /// exactly once.
  pub async fn check_status(&self) -> StatusCheck { self.evaluate().await.1 }

  async fn evaluate(&self) -> (u64, StatusCheck) {
    let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let has_potential_exposure = self.exposure.has_potential_exposure().await;

    let os = match self.tracker.query_status().await {
      Ok(os) => os,
      Err(e) => {
        warn!(error = %e, "location status unavailable; leaving tracking as is");
        return (generation, StatusCheck::Unavailable {
          has_potential_exposure,
          error: e.to_string(),
        });
      }
    };

    let inputs = TrackingInputs {
      user_opted_in:    self.is_opted_in().await,
      services_enabled: os.services_enabled,
      authorized:       os.authorized,
    };
    let (target, reason) = decide(&inputs);
    debug!(?inputs, ?target, ?reason, is_running = os.is_running, "tracking evaluated");

    (generation, StatusCheck::Available(TrackingStatus {
      can_track: target == TrackingState::Running,
      reason,
      has_potential_exposure,
      is_running: os.is_running,
    }))
  }

  /// Evaluate the status and start or stop the capture service to match it.
  ///
  /// Safe to call redundantly: a command is issued only on a state edge, and
  /// the collaborator's commands are idempotent. If a newer evaluation was
  /// issued while this one waited on the OS, no command is issued.
  pub async fn check_status_and_reconcile(&self) -> Result<StatusCheck> {
    let (generation, check) = self.evaluate().await;
    let latest = self.issued.load(Ordering::SeqCst);
    if generation != latest {
      debug!(generation, latest, "discarding superseded status evaluation");
      return Ok(check);
    }
    if let StatusCheck::Available(status) = &check {
      match reconcile(status.is_running, status.target()) {
        Some(TrackingCommand::Start) => self.start().await?,
        Some(TrackingCommand::Stop) => self.stop().await?,
        None => {}
      }
    }
    Ok(check)
  }

  async fn start(&self) -> Result<()> {
    info!("starting location tracking");
    self.tracker.start().await
  }

  /// Stop the capture service. Stopping always records the opt-out, even if
  /// the service itself failed to stop.
  async fn stop(&self) -> Result<()> {
    info!("stopping location tracking");
    let stopped = self.tracker.stop().await;
    self.notifier.notify(&Notification::LocationDisabled);
    if let Err(e) = self.prefs.set_flag(StorageKey::Participating, false).await {
      if let Err(stop_err) = &stopped {
        warn!(error = %stop_err, "capture service failed to stop");
      }
      return Err(e);
    }
    stopped
  }

  /// Record consent and reconcile.
  pub async fn opt_in(&self) -> Result<StatusCheck> {
    self.prefs.set_flag(StorageKey::Participating, true).await?;
    self.check_status_and_reconcile().await
  }

  /// Withdraw consent and reconcile.
  pub async fn opt_out(&self) -> Result<StatusCheck> {
    self.prefs.set_flag(StorageKey::Participating, false).await?;
    self.check_status_and_reconcile().await
  }
}
