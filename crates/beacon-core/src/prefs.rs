//! Typed access to the persisted key-value store.
//!
//! Reads never fail: an unreadable or mistyped value is logged and treated as
//! absent, which always maps to the safe default (not opted in, not
//! subscribed, no exposure). Writes return their error so the caller can
//! retry or alert the user.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::warn;

use crate::{
  Result,
  ports::{KeyValueStore, StorageKey},
};

pub struct Preferences<S> {
  store: S,
}

impl<S: KeyValueStore> Preferences<S> {
  pub fn new(store: S) -> Self { Self { store } }

  async fn read(&self, key: StorageKey) -> Option<Value> {
    match self.store.get_value(key).await {
      Ok(value) => value,
      Err(e) => {
        warn!(key = key.as_str(), error = %e, "storage read failed; treating as absent");
        None
      }
    }
  }

  /// The boolean stored under `key`, or `None` if nothing usable is stored.
  pub async fn flag_if_set(&self, key: StorageKey) -> Option<bool> {
    match self.read(key).await? {
      Value::Bool(b) => Some(b),
      other => {
        warn!(key = key.as_str(), value = %other, "expected a boolean; ignoring");
        None
      }
    }
  }

  /// The boolean stored under `key`, defaulting to `false`.
  pub async fn flag(&self, key: StorageKey) -> bool {
    self.flag_if_set(key).await.unwrap_or(false)
  }

  pub async fn set_flag(&self, key: StorageKey, value: bool) -> Result<()> {
    self.store.set_value(key, Value::Bool(value)).await
  }

  /// The set of strings stored under `key`; non-string members are skipped.
  pub async fn names(&self, key: StorageKey) -> BTreeSet<String> {
    match self.read(key).await {
      None | Some(Value::Null) => BTreeSet::new(),
      Some(Value::Array(items)) => items
        .into_iter()
        .filter_map(|v| match v {
          Value::String(s) => Some(s),
          _ => None,
        })
        .collect(),
      Some(other) => {
        warn!(key = key.as_str(), value = %other, "expected a list of names; ignoring");
        BTreeSet::new()
      }
    }
  }

  pub async fn set_names(
    &self,
    key: StorageKey,
    names: &BTreeSet<String>,
  ) -> Result<()> {
    let list = names.iter().cloned().map(Value::String).collect();
    self.store.set_value(key, Value::Array(list)).await
  }

  /// The list of non-negative counters stored under `key`.
  ///
  /// A list containing anything other than non-negative integers is rejected
  /// as a whole.
  pub async fn counters(&self, key: StorageKey) -> Vec<u32> {
    let Some(value) = self.read(key).await else { return Vec::new() };
    match serde_json::from_value::<Option<Vec<u32>>>(value) {
      Ok(counters) => counters.unwrap_or_default(),
      Err(e) => {
        warn!(key = key.as_str(), error = %e, "expected a list of counters; ignoring");
        Vec::new()
      }
    }
  }
}
