//! A [`LocationTracker`] driven by what the caller reports about the OS.
//!
//! The capture service itself runs elsewhere; this binary only decides
//! whether it should run, so status comes from command-line flags and
//! start/stop commands are logged and reflected in the reported state.

use std::sync::{Mutex, PoisonError};

use beacon_core::{
  ports::{LocationTracker, OsLocationStatus},
  tracking::LOCATION_UPDATE_INTERVAL,
};
use tracing::info;

pub struct ReportedTracker {
  status: Mutex<OsLocationStatus>,
}

impl ReportedTracker {
  pub fn new(status: OsLocationStatus) -> Self { Self { status: Mutex::new(status) } }

  fn set_running(&self, running: bool) {
    self.status.lock().unwrap_or_else(PoisonError::into_inner).is_running = running;
  }
}

impl LocationTracker for ReportedTracker {
  async fn query_status(&self) -> beacon_core::Result<OsLocationStatus> {
    Ok(*self.status.lock().unwrap_or_else(PoisonError::into_inner))
  }

  async fn start(&self) -> beacon_core::Result<()> {
    info!(interval = ?LOCATION_UPDATE_INTERVAL, "capture service: start");
    self.set_running(true);
    Ok(())
  }

  async fn stop(&self) -> beacon_core::Result<()> {
    info!("capture service: stop");
    self.set_running(false);
    Ok(())
  }
}
