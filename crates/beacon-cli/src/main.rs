//! `beacon`: command-line front end for the Beacon contact-tracing core.
//!
//! # Usage
//!
//! ```
//! beacon --config beacon.toml authorities
//! beacon record --lat 40.7 --lon -74.0
//! beacon status --services-enabled true --authorized true --reconcile
//! ```

mod notify;
mod platform;
mod roster;
mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use beacon_core::{
  authority::Authority,
  exposure::{DEFAULT_EXPOSURE_WINDOW_DAYS, ExposureEvaluator, has_potential_exposure},
  geo::{GeoPoint, LocationRecord},
  matcher::{authorities_in_history, match_point},
  ports::OsLocationStatus,
  registry::AuthorityRegistry,
  subscriptions::SubscriptionTracker,
  tracking::TrackingStateMachine,
};
use beacon_store_sqlite::SqliteStore;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use notify::ConsoleNotifier;
use platform::ReportedTracker;
use roster::RemoteRoster;
use serde::Serialize;
use settings::Settings;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Beacon contact-tracing core")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "beacon.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List every authority in the roster.
  Authorities {
    /// Discard the cached roster and fetch it again.
    #[arg(long)]
    refresh: bool,
  },
  /// Show one authority by name.
  Lookup { name: String },
  /// List the authorities covering a point.
  Match {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
  },
  /// List the authorities covering any point of the recorded trail.
  MatchHistory,
  /// Append a point to the location trail.
  Record {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long)]
    at:  Option<DateTime<Utc>>,
  },
  /// Drop trail points older than the given number of days.
  Prune {
    #[arg(long, default_value_t = DEFAULT_EXPOSURE_WINDOW_DAYS as i64)]
    days: i64,
  },
  Subscribe { name: String },
  Unsubscribe { name: String },
  /// List subscribed authorities.
  Subscriptions,
  /// Record the auto-subscription preference.
  AutoSubscribe { state: Toggle },
  /// Notify about unsubscribed authorities at the latest recorded location.
  CheckNew,
  /// Consent to location tracking and reconcile.
  OptIn(PlatformArgs),
  /// Withdraw consent and reconcile.
  OptOut(PlatformArgs),
  /// Evaluate the tracking status.
  Status {
    #[command(flatten)]
    platform:  PlatformArgs,
    /// Start or stop the capture service to match the evaluated status.
    #[arg(long)]
    reconcile: bool,
  },
  /// Report whether the exposure counters show a potential exposure.
  Exposure,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
  On,
  Off,
}

/// What the OS currently reports about location services. Each flag takes an
/// explicit `true` or `false`.
#[derive(Args)]
struct PlatformArgs {
  /// Whether OS location services are enabled.
  #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
  services_enabled: bool,
  /// Whether the app is authorised to read the location.
  #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
  authorized:       bool,
  /// Whether the capture service is currently running.
  #[arg(long, value_name = "BOOL", default_value_t = false, action = ArgAction::Set)]
  running:          bool,
}

impl PlatformArgs {
  fn tracker(&self) -> ReportedTracker {
    ReportedTracker::new(OsLocationStatus {
      authorized:       self.authorized,
      services_enabled: self.services_enabled,
      is_running:       self.running,
    })
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing. stdout is reserved for command output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  if let Some(parent) = settings.store_path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", settings.store_path.display()))?;
  info!(path = %settings.store_path.display(), "store opened");

  let registry = AuthorityRegistry::new(RemoteRoster::new(
    &settings.roster_url,
    Duration::from_secs(settings.request_timeout_secs),
  )?);

  run(cli.command, store, registry).await
}

async fn run(
  command: Command,
  store: SqliteStore,
  registry: AuthorityRegistry<RemoteRoster>,
) -> anyhow::Result<()> {
  let subscriptions = SubscriptionTracker::new(store.clone());

  match command {
    Command::Authorities { refresh } => {
      let roster = if refresh { registry.refresh().await } else { registry.load().await };
      print_json(&roster[..])?;
    }
    Command::Lookup { name } => match registry.get(&name).await {
      Some(authority) => print_json(&authority)?,
      None => bail!("no authority named {name:?}"),
    },
    Command::Match { lat, lon } => {
      let point = GeoPoint::new(lat, lon)?;
      print_names(&match_point(&point, &registry.load().await));
    }
    Command::MatchHistory => {
      print_names(&authorities_in_history(&store, &registry).await?);
    }
    Command::Record { lat, lon, at } => {
      let record = LocationRecord {
        point:       GeoPoint::new(lat, lon)?,
        recorded_at: at.unwrap_or_else(Utc::now),
      };
      store.append_location(&record).await?;
    }
    Command::Prune { days } => {
      let cutoff = prune_cutoff(Utc::now(), days)?;
      let removed = store.prune_before(cutoff).await?;
      println!("removed {removed} location(s) recorded before {cutoff}");
    }
    Command::Subscribe { name } => {
      if registry.get(&name).await.is_none() {
        warn!(%name, "authority is not in the current roster");
      }
      if !subscriptions.subscribe(&name).await? {
        println!("already subscribed to {name}");
      }
    }
    Command::Unsubscribe { name } => {
      if !subscriptions.unsubscribe(&name).await? {
        println!("not subscribed to {name}");
      }
    }
    Command::Subscriptions => {
      for name in subscriptions.subscribed_names().await {
        println!("{name}");
      }
    }
    Command::AutoSubscribe { state } => {
      subscriptions
        .set_auto_subscription(matches!(state, Toggle::On))
        .await?;
    }
    Command::CheckNew => {
      let fresh = subscriptions
        .find_new_authorities(&store, &registry, &ConsoleNotifier)
        .await?;
      print_names(&fresh);
    }
    Command::OptIn(platform) => {
      let machine = TrackingStateMachine::new(store, platform.tracker(), ConsoleNotifier);
      print_json(&machine.opt_in().await?)?;
    }
    Command::OptOut(platform) => {
      let machine = TrackingStateMachine::new(store, platform.tracker(), ConsoleNotifier);
      print_json(&machine.opt_out().await?)?;
    }
    Command::Status { platform, reconcile } => {
      let machine = TrackingStateMachine::new(store, platform.tracker(), ConsoleNotifier);
      let check = if reconcile {
        machine.check_status_and_reconcile().await?
      } else {
        machine.check_status().await
      };
      print_json(&check)?;
    }
    Command::Exposure => {
      let evaluator = ExposureEvaluator::new(store);
      let bins = evaluator.day_bins().await;
      println!(
        "potential exposure: {} ({} day(s) of history)",
        has_potential_exposure(&bins),
        bins.len()
      );
    }
  }
  Ok(())
}

/// The instant `days` days before `now`.
fn prune_cutoff(now: DateTime<Utc>, days: i64) -> anyhow::Result<DateTime<Utc>> {
  if days < 0 {
    bail!("--days must not be negative (got {days})");
  }
  TimeDelta::try_days(days)
    .and_then(|window| now.checked_sub_signed(window))
    .with_context(|| format!("--days {days} is out of range"))
}

fn print_names(authorities: &[Authority]) {
  for authority in authorities {
    println!("{}", authority.name);
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2020, 4, 29, 12, 0, 0).unwrap() }

  #[test]
  fn cutoff_is_days_before_now() {
    let cutoff = prune_cutoff(now(), 28).unwrap();
    assert_eq!(cutoff, Utc.with_ymd_and_hms(2020, 4, 1, 12, 0, 0).unwrap());
    assert_eq!(prune_cutoff(now(), 0).unwrap(), now());
  }

  #[test]
  fn negative_days_are_rejected() {
    assert!(prune_cutoff(now(), -1).is_err());
  }

  #[test]
  fn huge_day_counts_are_errors_not_panics() {
    assert!(prune_cutoff(now(), 200_000_000_000).is_err());
    assert!(prune_cutoff(now(), 100_000_000).is_err());
    assert!(prune_cutoff(now(), i64::MAX).is_err());
  }

  #[test]
  fn platform_flags_take_explicit_values() {
    let cli = Cli::try_parse_from([
      "beacon",
      "status",
      "--services-enabled",
      "false",
      "--running",
      "true",
      "--reconcile",
    ])
    .unwrap();
    let Command::Status { platform, reconcile } = cli.command else { panic!("expected status") };
    assert!(!platform.services_enabled);
    assert!(platform.authorized);
    assert!(platform.running);
    assert!(reconcile);
  }

  #[test]
  fn platform_flags_default_to_a_healthy_stopped_service() {
    let cli = Cli::try_parse_from(["beacon", "opt-in"]).unwrap();
    let Command::OptIn(platform) = cli.command else { panic!("expected opt-in") };
    assert!(platform.services_enabled);
    assert!(platform.authorized);
    assert!(!platform.running);
  }
}
