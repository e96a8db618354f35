//! Core decision logic for the Beacon location-trail client.
//!
//! Records nothing and sends nothing by itself: it consumes a location
//! history, a roster of health care authorities and a key-value store through
//! the traits in [`ports`], and decides whom to notify, what to subscribe to,
//! and whether location tracking should be running.
//!
//! This crate has no HTTP or database dependencies.

// We intentionally use native `async fn` in traits.
#![allow(async_fn_in_trait)]

pub mod authority;
pub mod error;
pub mod exposure;
pub mod geo;
pub mod matcher;
pub mod ports;
pub mod prefs;
pub mod registry;
pub mod subscriptions;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
