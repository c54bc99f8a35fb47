//! Nightscout transport — the concrete [`TelemetrySource`].
//!
//! Three GET endpoints, each returning a JSON array newest-first,
//! parameterized by a result-count limit and an access token. A non-success
//! status is not an error: it yields an empty batch, because "empty means
//! nothing new" is how the sync driver wants to see upstream hiccups.

pub mod error;

pub use error::{Error, Result};

use std::time::Duration;

use glyco_core::source::TelemetrySource;
use serde::Deserialize;
use serde_json::Value;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 { 30 }

/// Connection settings for the upstream Nightscout site, deserialised from
/// the `[upstream]` config table.
#[derive(Debug, Clone, Deserialize)]
pub struct NightscoutConfig {
  /// Site base URL including scheme, e.g. `https://cgm.example.com`.
  pub base_url:     String,
  /// Access token passed as a query parameter.
  pub token:        String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Async client for the Nightscout v1 API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct NightscoutSource {
  client: reqwest::Client,
  config: NightscoutConfig,
}

impl NightscoutSource {
  pub fn new(config: NightscoutConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, endpoint: &str, limit: usize) -> String {
    format!(
      "{}/api/v1/{endpoint}/?count={limit}&token={}",
      self.config.base_url.trim_end_matches('/'),
      self.config.token,
    )
  }

  async fn fetch(&self, endpoint: &str, limit: usize) -> Result<Vec<Value>> {
    let response = self
      .client
      .get(self.url(endpoint, limit))
      .header("accept", "application/json")
      .send()
      .await?;

    if !response.status().is_success() {
      tracing::debug!(endpoint, status = %response.status(), "non-success upstream response");
      return Ok(Vec::new());
    }
    Ok(response.json().await?)
  }
}

impl TelemetrySource for NightscoutSource {
  type Error = Error;

  async fn fetch_glucose(&self, limit: usize) -> Result<Vec<Value>> {
    self.fetch("entries", limit).await
  }

  async fn fetch_treatments(&self, limit: usize) -> Result<Vec<Value>> {
    self.fetch("treatments", limit).await
  }

  async fn fetch_device_status(&self, limit: usize) -> Result<Vec<Value>> {
    self.fetch("devicestatus", limit).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn source() -> NightscoutSource {
    NightscoutSource::new(NightscoutConfig {
      base_url:     "https://cgm.example.com/".to_string(),
      token:        "tok".to_string(),
      timeout_secs: 30,
    })
    .unwrap()
  }

  #[test]
  fn urls_cover_the_three_streams() {
    let s = source();
    assert_eq!(
      s.url("entries", 100),
      "https://cgm.example.com/api/v1/entries/?count=100&token=tok"
    );
    assert_eq!(
      s.url("treatments", 50),
      "https://cgm.example.com/api/v1/treatments/?count=50&token=tok"
    );
    assert_eq!(
      s.url("devicestatus", 10),
      "https://cgm.example.com/api/v1/devicestatus/?count=10&token=tok"
    );
  }
}
