//! Error type for `beacon-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] beacon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything this crate raises surfaces to the core as a storage failure.
impl From<Error> for beacon_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(core) => core,
      other => beacon_core::Error::storage(other),
    }
  }
}
