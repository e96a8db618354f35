//! [`SqliteStore`]: the SQLite implementation of [`KeyValueStore`] and
//! [`LocationHistory`].

use std::path::Path;

use beacon_core::{
  geo::{GeoPoint, LocationRecord},
  ports::{KeyValueStore, LocationHistory, StorageKey},
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use serde_json::Value;
use tracing::debug;

use crate::{
  Result,
  encode::{RawLocation, decode_value, encode_dt, encode_value},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Beacon's persisted state backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Preferences ───────────────────────────────────────────────────────────

  async fn read_value(&self, key: StorageKey) -> Result<Option<Value>> {
    let key_str = key.as_str();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value_json FROM preferences WHERE key = ?1",
              rusqlite::params![key_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_value).transpose()
  }

  async fn write_value(&self, key: StorageKey, value: &Value) -> Result<()> {
    let key_str   = key.as_str();
    let value_str = encode_value(value)?;
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO preferences (key, value_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (key) DO UPDATE
             SET value_json = excluded.value_json,
                 updated_at = excluded.updated_at",
          rusqlite::params![key_str, value_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Location trail ────────────────────────────────────────────────────────

  /// Append a point to the trail. This is the capture service's write path;
  /// the core never calls it.
  pub async fn append_location(&self, record: &LocationRecord) -> Result<()> {
    let latitude  = record.point.latitude;
    let longitude = record.point.longitude;
    let at_str    = encode_dt(record.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations (latitude, longitude, recorded_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![latitude, longitude, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Delete every point recorded strictly before `cutoff`. Returns the number
  /// of points removed.
  pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let cutoff_str = encode_dt(cutoff);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM locations WHERE recorded_at < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;

    debug!(removed, %cutoff, "pruned location trail");
    Ok(removed)
  }

  async fn read_history(&self) -> Result<Vec<LocationRecord>> {
    let raws: Vec<RawLocation> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT latitude, longitude, recorded_at FROM locations
           ORDER BY recorded_at ASC, location_id ASC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawLocation {
              latitude:    row.get(0)?,
              longitude:   row.get(1)?,
              recorded_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLocation::into_record).collect()
  }

  async fn read_latest(&self) -> Result<Option<GeoPoint>> {
    let raw: Option<RawLocation> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT latitude, longitude, recorded_at FROM locations
               ORDER BY recorded_at DESC, location_id DESC LIMIT 1",
              [],
              |row| {
                Ok(RawLocation {
                  latitude:    row.get(0)?,
                  longitude:   row.get(1)?,
                  recorded_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawLocation::into_record).transpose()?.map(|r| r.point))
  }
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  async fn get_value(&self, key: StorageKey) -> beacon_core::Result<Option<Value>> {
    Ok(self.read_value(key).await?)
  }

  async fn set_value(&self, key: StorageKey, value: Value) -> beacon_core::Result<()> {
    Ok(self.write_value(key, &value).await?)
  }
}

impl LocationHistory for SqliteStore {
  async fn location_history(&self) -> beacon_core::Result<Vec<LocationRecord>> {
    Ok(self.read_history().await?)
  }

  async fn most_recent_location(&self) -> beacon_core::Result<Option<GeoPoint>> {
    Ok(self.read_latest().await?)
  }
}
