//! Remote telemetry store — [`TelemetryStore`] over the glyco REST facade.
//!
//! This is the three-tier deployment shape: the sync driver runs on one host
//! and writes through the API instead of opening the database directly.
//! Cursor tails go through the privileged `/put/command` passthrough exactly
//! as the reference parser does; record writes use the typed routes.
//!
//! Authentication is a bearer token from `POST /token`, refreshed
//! proactively once a configured share of its lifetime has elapsed rather
//! than reactively on 401.

pub mod decode;
pub mod error;

pub use error::{Error, Result};

use std::time::{Duration, Instant};

use glyco_core::{
  record::{DeviceSnapshot, DoseEvent, GlucoseSample},
  store::TelemetryStore,
  time::CanonicalTime,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use decode::{dose_from_row, glucose_from_row};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_token_life() -> u64 { 30 }
fn default_timeout_secs() -> u64 { 30 }

/// Connection settings for the remote facade, deserialised from the
/// `[remote]` config table.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Facade base URL including scheme, e.g. `http://api.example.com:8000`.
  pub base_url:           String,
  pub username:           String,
  pub password:           String,
  /// The token lifetime the server issues, in minutes. The client refreshes
  /// once 80% of this has elapsed.
  #[serde(default = "default_token_life")]
  pub token_life_minutes: u64,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:       u64,
}

// ─── Token cache ─────────────────────────────────────────────────────────────

struct CachedToken {
  token:       String,
  acquired_at: Instant,
}

/// Refresh before expiry: at 80% of the advertised lifetime.
fn should_refresh(elapsed: Duration, life: Duration) -> bool {
  elapsed >= life * 4 / 5
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

// ─── RemoteStore ─────────────────────────────────────────────────────────────

/// A glyco store backed by the REST facade.
pub struct RemoteStore {
  client: reqwest::Client,
  config: RemoteConfig,
  token:  Mutex<Option<CachedToken>>,
}

impl RemoteStore {
  pub fn new(config: RemoteConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config, token: Mutex::new(None) })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.base_url.trim_end_matches('/'))
  }

  /// A valid bearer token, fetching or proactively refreshing as needed.
  async fn bearer(&self) -> Result<String> {
    let mut cached = self.token.lock().await;
    let life = Duration::from_secs(self.config.token_life_minutes * 60);
    if let Some(t) = cached.as_ref()
      && !should_refresh(t.acquired_at.elapsed(), life)
    {
      return Ok(t.token.clone());
    }

    let response = self
      .client
      .post(self.url("/token"))
      .json(&json!({
        "username": self.config.username,
        "password": self.config.password,
      }))
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(Error::Api {
        status: response.status().as_u16(),
        path:   "/token".to_string(),
      });
    }
    let body: TokenResponse = response.json().await?;
    tracing::debug!("acquired fresh bearer token");
    *cached = Some(CachedToken {
      token:       body.access_token.clone(),
      acquired_at: Instant::now(),
    });
    Ok(body.access_token)
  }

  /// Run a cursor read through the command passthrough.
  async fn command(&self, query: &str, params: Vec<Value>) -> Result<Vec<Vec<Value>>> {
    let token = self.bearer().await?;
    let response = self
      .client
      .put(self.url("/put/command"))
      .bearer_auth(token)
      .json(&json!({ "query": query, "params": params }))
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(Error::Api {
        status: response.status().as_u16(),
        path:   "/put/command".to_string(),
      });
    }
    Ok(response.json().await?)
  }

  /// PUT or POST a record body to a typed write route.
  async fn write(&self, method: reqwest::Method, path: &str, body: Value) -> Result<()> {
    let token = self.bearer().await?;
    let response = self
      .client
      .request(method, self.url(path))
      .bearer_auth(token)
      .json(&body)
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(Error::Api {
        status: response.status().as_u16(),
        path:   path.to_string(),
      });
    }
    Ok(())
  }

  /// GET a typed read route; 404 maps to `None`.
  async fn read_optional<T: serde::de::DeserializeOwned>(
    &self,
    path: &str,
  ) -> Result<Option<T>> {
    let token = self.bearer().await?;
    let response = self
      .client
      .get(self.url(path))
      .bearer_auth(token)
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !response.status().is_success() {
      return Err(Error::Api {
        status: response.status().as_u16(),
        path:   path.to_string(),
      });
    }
    Ok(Some(response.json().await?))
  }
}

// ─── TelemetryStore impl ─────────────────────────────────────────────────────

impl TelemetryStore for RemoteStore {
  type Error = Error;

  async fn glucose_tail(&self, limit: usize) -> Result<Vec<GlucoseSample>> {
    let rows = self
      .command(
        "SELECT id, at, value, source_device, trend, difference \
         FROM glucose ORDER BY at DESC, id DESC LIMIT ?1",
        vec![json!(limit)],
      )
      .await?;
    rows.iter().map(|r| glucose_from_row(r)).collect()
  }

  async fn dose_tail(&self, limit: usize) -> Result<Vec<DoseEvent>> {
    let rows = self
      .command(
        "SELECT id, at, kind, rate_or_amount, carbs, duration_minutes, label \
         FROM dose ORDER BY at DESC, id DESC LIMIT ?1",
        vec![json!(limit)],
      )
      .await?;
    rows.iter().map(|r| dose_from_row(r)).collect()
  }

  async fn device_snapshot(&self) -> Result<Option<DeviceSnapshot>> {
    self.read_optional("/get/device/last").await
  }

  async fn insert_glucose(&self, sample: GlucoseSample) -> Result<()> {
    let body = serde_json::to_value(&sample).map_err(|e| Error::Decode(e.to_string()))?;
    self.write(reqwest::Method::PUT, "/put/sugar", body).await
  }

  async fn insert_dose(&self, event: DoseEvent) -> Result<()> {
    let body = serde_json::to_value(&event).map_err(|e| Error::Decode(e.to_string()))?;
    self.write(reqwest::Method::PUT, "/put/insulin", body).await
  }

  async fn insert_device(&self, snapshot: DeviceSnapshot) -> Result<()> {
    let body =
      serde_json::to_value(&snapshot).map_err(|e| Error::Decode(e.to_string()))?;
    self.write(reqwest::Method::PUT, "/put/device", body).await
  }

  async fn update_device(&self, snapshot: DeviceSnapshot) -> Result<()> {
    let body =
      serde_json::to_value(&snapshot).map_err(|e| Error::Decode(e.to_string()))?;
    self.write(reqwest::Method::POST, "/post/device", body).await
  }

  async fn glucose_by_id(&self, id: i64) -> Result<Option<GlucoseSample>> {
    self.read_optional(&format!("/get/sugar/id?id={id}")).await
  }

  async fn glucose_range(
    &self,
    start: CanonicalTime,
    end: CanonicalTime,
  ) -> Result<Vec<GlucoseSample>> {
    let rows = self
      .read_optional(&format!("/get/sugar/date?start={start}&end={end}"))
      .await?;
    Ok(rows.unwrap_or_default())
  }

  async fn dose_by_id(&self, id: i64) -> Result<Option<DoseEvent>> {
    self.read_optional(&format!("/get/insulin/id?id={id}")).await
  }

  async fn dose_range(
    &self,
    start: CanonicalTime,
    end: CanonicalTime,
  ) -> Result<Vec<DoseEvent>> {
    let rows = self
      .read_optional(&format!("/get/insulin/date?start={start}&end={end}"))
      .await?;
    Ok(rows.unwrap_or_default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn refresh_fires_at_eighty_percent_of_the_lifetime() {
    let life = Duration::from_secs(300);
    assert!(!should_refresh(Duration::from_secs(0), life));
    assert!(!should_refresh(Duration::from_secs(239), life));
    assert!(should_refresh(Duration::from_secs(240), life));
    assert!(should_refresh(Duration::from_secs(301), life));
  }

  #[test]
  fn urls_join_without_doubled_slashes() {
    let store = RemoteStore::new(RemoteConfig {
      base_url:           "http://api.example.com:8000/".to_string(),
      username:           "alice".to_string(),
      password:           "secret".to_string(),
      token_life_minutes: 30,
      timeout_secs:       30,
    })
    .unwrap();
    assert_eq!(store.url("/token"), "http://api.example.com:8000/token");
    assert_eq!(store.url("/get/sugar/id?id=7"), "http://api.example.com:8000/get/sugar/id?id=7");
  }
}
