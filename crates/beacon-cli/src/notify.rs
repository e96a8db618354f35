//! Notification delivery to the terminal.

use beacon_core::ports::{Notification, Notifier};
use tracing::info;

/// Prints notifications to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
  fn notify(&self, notification: &Notification) {
    info!(?notification, "notification");
    println!("[{}] {}", notification.title(), notification.body());
  }
}
