//! SQLite backend for Beacon's persisted state.
//!
//! One file holds both the key-value preferences read by the core and the
//! location trail appended by the capture service. Wraps [`tokio_rusqlite`]
//! so all database access runs on a dedicated thread without blocking the
//! async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
