//! Roster retrieval over HTTP(S) or from a local file.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use beacon_core::{Error, ports::RosterSource};
use reqwest::Client;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
  Http(String),
  File(PathBuf),
}

impl Location {
  fn parse(roster_url: &str) -> Self {
    if roster_url.starts_with("http://") || roster_url.starts_with("https://") {
      return Self::Http(roster_url.to_owned());
    }
    let path = roster_url.strip_prefix("file://").unwrap_or(roster_url);
    Self::File(PathBuf::from(path))
  }
}

/// Fetches the authority roster document from the configured location.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RemoteRoster {
  client:   Client,
  location: Location,
}

impl RemoteRoster {
  pub fn new(roster_url: &str, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, location: Location::parse(roster_url) })
  }
}

impl RosterSource for RemoteRoster {
  async fn fetch_roster(&self) -> beacon_core::Result<String> {
    match &self.location {
      Location::Http(url) => {
        debug!(%url, "fetching authority roster");
        let resp = self
          .client
          .get(url)
          .send()
          .await
          .map_err(|e| Error::Fetch(format!("GET {url}: {e}")))?;

        if !resp.status().is_success() {
          return Err(Error::Fetch(format!("GET {url} → {}", resp.status())));
        }
        resp
          .text()
          .await
          .map_err(|e| Error::Fetch(format!("reading roster body: {e}")))
      }
      Location::File(path) => {
        debug!(path = %path.display(), "reading authority roster");
        tokio::fs::read_to_string(path)
          .await
          .map_err(|e| Error::Fetch(format!("{}: {e}", path.display())))
      }
    }
  }
}
