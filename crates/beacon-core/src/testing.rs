//! In-memory fakes of the collaborator traits, shared by the unit tests.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex},
};

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::{
  Error, Result,
  geo::{GeoPoint, LocationRecord},
  ports::{
    KeyValueStore, LocationHistory, LocationTracker, Notification, Notifier,
    OsLocationStatus, RosterSource, StorageKey,
  },
};

pub fn point(lat: f64, lon: f64) -> GeoPoint { GeoPoint::new(lat, lon).unwrap() }

// ─── MemoryStore ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreInner {
  values:      HashMap<StorageKey, Value>,
  fail_reads:  bool,
  fail_writes: bool,
  writes:      usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
  pub fn put(&self, key: StorageKey, value: Value) {
    self.inner.lock().unwrap().values.insert(key, value);
  }

  pub fn raw(&self, key: StorageKey) -> Option<Value> {
    self.inner.lock().unwrap().values.get(&key).cloned()
  }

  pub fn fail_reads(&self, fail: bool) { self.inner.lock().unwrap().fail_reads = fail; }

  pub fn fail_writes(&self, fail: bool) { self.inner.lock().unwrap().fail_writes = fail; }

  pub fn writes(&self) -> usize { self.inner.lock().unwrap().writes }
}

impl KeyValueStore for MemoryStore {
  async fn get_value(&self, key: StorageKey) -> Result<Option<Value>> {
    let inner = self.inner.lock().unwrap();
    if inner.fail_reads {
      return Err(Error::storage("read refused"));
    }
    Ok(inner.values.get(&key).cloned())
  }

  async fn set_value(&self, key: StorageKey, value: Value) -> Result<()> {
    let mut inner = self.inner.lock().unwrap();
    if inner.fail_writes {
      return Err(Error::storage("write refused"));
    }
    inner.writes += 1;
    inner.values.insert(key, value);
    Ok(())
  }
}

// ─── ScriptedRoster ──────────────────────────────────────────────────────────

/// Replays queued responses, then repeats the last one.
#[derive(Clone, Default)]
pub struct ScriptedRoster {
  responses: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
  fetches:   Arc<Mutex<usize>>,
}

impl ScriptedRoster {
  pub fn serving(document: &str) -> Self {
    let roster = Self::default();
    roster.push_ok(document);
    roster
  }

  pub fn failing() -> Self {
    let roster = Self::default();
    roster.push_err("connection refused");
    roster
  }

  pub fn push_ok(&self, document: &str) {
    self.responses.lock().unwrap().push_back(Ok(document.to_owned()));
  }

  pub fn push_err(&self, message: &str) {
    self.responses.lock().unwrap().push_back(Err(message.to_owned()));
  }

  pub fn fetches(&self) -> usize { *self.fetches.lock().unwrap() }
}

impl RosterSource for ScriptedRoster {
  async fn fetch_roster(&self) -> Result<String> {
    *self.fetches.lock().unwrap() += 1;
    let mut responses = self.responses.lock().unwrap();
    let next = if responses.len() > 1 {
      responses.pop_front()
    } else {
      responses.front().cloned()
    };
    match next {
      Some(Ok(doc)) => Ok(doc),
      Some(Err(msg)) => Err(Error::Fetch(msg)),
      None => Err(Error::Fetch("no response scripted".to_owned())),
    }
  }
}

/// A one-authority roster: "Alpha" covering (0,0)–(10,10).
pub const ALPHA_ROSTER: &str = r#"{"Authorities": [
  { "Alpha": [ { "url": "https://alpha.example/paths.json" },
               { "bounds": { "ne": { "latitude": 10, "longitude": 10 },
                             "sw": { "latitude": 0,  "longitude": 0 } } } ] }
]}"#;

/// Alpha, Beta (overlapping Alpha's north-east quarter) and Gamma (no bounds).
pub const THREE_ROSTER: &str = r#"{"Authorities": [
  { "Alpha": [ { "url": "https://alpha.example/paths.json" },
               { "bounds": { "ne": { "latitude": 10, "longitude": 10 },
                             "sw": { "latitude": 0,  "longitude": 0 } } } ] },
  { "Beta":  [ { "url": "https://beta.example/paths.json" },
               { "bounds": { "ne": { "latitude": 20, "longitude": 20 },
                             "sw": { "latitude": 5,  "longitude": 5 } } } ] },
  { "Gamma": [ { "url": "https://gamma.example/paths.json" } ] }
]}"#;

// ─── MemoryHistory ───────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryHistory {
  records: Arc<Mutex<Vec<LocationRecord>>>,
}

impl MemoryHistory {
  pub fn with_points(points: &[(f64, f64)]) -> Self {
    let history = Self::default();
    for (i, &(lat, lon)) in points.iter().enumerate() {
      history.records.lock().unwrap().push(LocationRecord {
        point:       point(lat, lon),
        recorded_at: Utc.timestamp_opt(1_600_000_000 + 300 * i as i64, 0).unwrap(),
      });
    }
    history
  }
}

impl LocationHistory for MemoryHistory {
  async fn location_history(&self) -> Result<Vec<LocationRecord>> {
    Ok(self.records.lock().unwrap().clone())
  }

  async fn most_recent_location(&self) -> Result<Option<GeoPoint>> {
    Ok(self.records.lock().unwrap().last().map(|r| r.point))
  }
}

// ─── FakeTracker ─────────────────────────────────────────────────────────────

struct TrackerInner {
  status:   std::result::Result<OsLocationStatus, String>,
  starts:   usize,
  stops:    usize,
  queries:  usize,
  failing:  bool,
}

/// Mimics the capture service: `start`/`stop` flip `is_running`.
#[derive(Clone)]
pub struct FakeTracker {
  inner: Arc<Mutex<TrackerInner>>,
}

impl FakeTracker {
  pub fn new(services_enabled: bool, authorized: bool, is_running: bool) -> Self {
    Self {
      inner: Arc::new(Mutex::new(TrackerInner {
        status:  Ok(OsLocationStatus { authorized, services_enabled, is_running }),
        starts:  0,
        stops:   0,
        queries: 0,
        failing: false,
      })),
    }
  }

  pub fn broken() -> Self {
    let tracker = Self::new(true, true, true);
    tracker.inner.lock().unwrap().status = Err("status unavailable".to_owned());
    tracker
  }

  /// Make `start` and `stop` fail with a platform error.
  pub fn fail_commands(&self, failing: bool) { self.inner.lock().unwrap().failing = failing; }

  pub fn starts(&self) -> usize { self.inner.lock().unwrap().starts }

  pub fn stops(&self) -> usize { self.inner.lock().unwrap().stops }

  pub fn queries(&self) -> usize { self.inner.lock().unwrap().queries }

  fn set_running(&self, running: bool) {
    if let Ok(status) = &mut self.inner.lock().unwrap().status {
      status.is_running = running;
    }
  }
}

impl LocationTracker for FakeTracker {
  async fn query_status(&self) -> Result<OsLocationStatus> {
    let mut inner = self.inner.lock().unwrap();
    inner.queries += 1;
    inner.status.clone().map_err(Error::Platform)
  }

  async fn start(&self) -> Result<()> {
    {
      let mut inner = self.inner.lock().unwrap();
      inner.starts += 1;
      if inner.failing {
        return Err(Error::Platform("start refused".to_owned()));
      }
    }
    self.set_running(true);
    Ok(())
  }

  async fn stop(&self) -> Result<()> {
    {
      let mut inner = self.inner.lock().unwrap();
      inner.stops += 1;
      if inner.failing {
        return Err(Error::Platform("stop refused".to_owned()));
      }
    }
    self.set_running(false);
    Ok(())
  }
}

// ─── RecordingNotifier ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingNotifier {
  sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
  pub fn sent(&self) -> Vec<Notification> { self.sent.lock().unwrap().clone() }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notification: &Notification) {
    self.sent.lock().unwrap().push(notification.clone());
  }
}
