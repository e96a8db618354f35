//! Error types for `beacon-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The authority roster could not be retrieved from its source.
  #[error("roster fetch failed: {0}")]
  Fetch(String),

  /// The roster document was retrieved but is not a usable roster.
  #[error("malformed roster document: {0}")]
  Parse(String),

  /// The OS location-status query (or a start/stop command) failed.
  #[error("location platform error: {0}")]
  Platform(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("coordinate out of range: latitude {latitude}, longitude {longitude}")]
  InvalidCoordinate { latitude: f64, longitude: f64 },

  #[error("north-east corner lies south of the south-west corner")]
  InvalidBounds,
}

impl Error {
  /// Wrap any error (or message) raised by a persistence backend.
  pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self::Storage(err.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
