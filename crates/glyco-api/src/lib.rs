//! JSON REST facade for glyco.
//!
//! Exposes an axum [`Router`] backed by any [`TelemetryStore`] +
//! [`CommandStore`] pair. Every route except `POST /token` requires a
//! bearer token issued by that route; verification is signature + expiry
//! only.

pub mod auth;
pub mod command;
pub mod error;
pub mod records;
pub mod tokens;
pub mod users;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use glyco_core::store::{CommandStore, TelemetryStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::TokenAuthority;
use users::UserRegistry;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8000 }
fn default_token_life() -> i64 { 30 }
fn default_users_path() -> PathBuf { PathBuf::from("users.json") }

/// Runtime facade configuration, deserialised from the `[api]` config table.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  /// Token-signing secret. The only required field.
  pub secret:             String,
  #[serde(default = "default_token_life")]
  pub token_life_minutes: i64,
  #[serde(default = "default_users_path")]
  pub users_path:         PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenAuthority>,
  pub users:  Arc<UserRegistry>,
}

// A manual impl: cloning the state never requires cloning the store itself.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      tokens: self.tokens.clone(),
      users:  self.users.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the facade router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: TelemetryStore + CommandStore + 'static,
{
  Router::new()
    // Auth
    .route("/token", post(tokens::issue::<S>))
    .route("/create/user", put(tokens::create_user::<S>))
    // Writes
    .route("/put/sugar", put(records::put_sugar::<S>))
    .route("/put/insulin", put(records::put_insulin::<S>))
    .route("/put/device", put(records::put_device::<S>))
    .route("/post/device", post(records::post_device::<S>))
    .route("/put/command", put(command::run::<S>))
    // Read-back
    .route("/get/sugar/last", get(records::sugar_last::<S>))
    .route("/get/sugar/id", get(records::sugar_by_id::<S>))
    .route("/get/sugar/date", get(records::sugar_by_date::<S>))
    .route("/get/insulin/last", get(records::insulin_last::<S>))
    .route("/get/insulin/id", get(records::insulin_by_id::<S>))
    .route("/get/insulin/date", get(records::insulin_by_date::<S>))
    .route("/get/device/last", get(records::device_last::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use glyco_core::{
    record::{DeviceNames, DeviceSnapshot, DoseEvent, DoseKind, GlucoseSample},
    time::CanonicalTime,
  };
  use glyco_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut entries = HashMap::new();
    entries.insert(
      "alice".to_string(),
      UserRegistry::hash_password("secret").unwrap(),
    );
    AppState {
      store:  Arc::new(store),
      tokens: Arc::new(TokenAuthority::new("test-secret", 30)),
      users:  Arc::new(UserRegistry::from_entries(entries)),
    }
  }

  async fn oneshot_json(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
  }

  async fn issue_token(state: AppState<SqliteStore>) -> String {
    let (status, body) = oneshot_json(
      state,
      "POST",
      "/token",
      None,
      Some(json!({ "username": "alice", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
  }

  fn at(compact: &str) -> CanonicalTime {
    CanonicalTime::parse_compact(compact).unwrap()
  }

  fn sample(id: i64, compact: &str, value: f64) -> GlucoseSample {
    GlucoseSample {
      id,
      at: at(compact),
      value,
      source_device: "cgm".to_string(),
      trend: "Flat".to_string(),
      difference: "+0.3".to_string(),
    }
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn token_requires_valid_credentials() {
    let state = make_state().await;
    let (status, _) = oneshot_json(
      state.clone(),
      "POST",
      "/token",
      None,
      Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    issue_token(state).await;
  }

  #[tokio::test]
  async fn routes_reject_missing_or_garbage_tokens() {
    let state = make_state().await;

    let (status, _) =
      oneshot_json(state.clone(), "GET", "/get/sugar/last", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = oneshot_json(
      state,
      "GET",
      "/get/sugar/last",
      Some("not-a-token"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn created_users_can_authenticate() {
    let state = make_state().await;
    let token = issue_token(state.clone()).await;

    let (status, body) = oneshot_json(
      state.clone(),
      "PUT",
      "/create/user",
      Some(&token),
      Some(json!({ "username": "bob", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], true);

    let (status, _) = oneshot_json(
      state,
      "POST",
      "/token",
      None,
      Some(json!({ "username": "bob", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
  }

  // ── Glucose ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sugar_put_and_read_back() {
    let state = make_state().await;
    let token = issue_token(state.clone()).await;

    let row = sample(7, "2024-01-15-08-00", 9.4);
    let (status, body) = oneshot_json(
      state.clone(),
      "PUT",
      "/put/sugar",
      Some(&token),
      Some(serde_json::to_value(&row).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], true);

    let (status, body) =
      oneshot_json(state.clone(), "GET", "/get/sugar/last", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 7);
    assert_eq!(body["difference"], "+0.3");

    let (status, body) =
      oneshot_json(state.clone(), "GET", "/get/sugar/id?id=7", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 9.4);

    let (status, body) = oneshot_json(
      state.clone(),
      "GET",
      "/get/sugar/date?start=2024-01-15-00-00&end=2024-01-15-23-59",
      Some(&token),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) =
      oneshot_json(state, "GET", "/get/sugar/id?id=99", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Dose ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn insulin_put_and_read_back() {
    let state = make_state().await;
    let token = issue_token(state.clone()).await;

    let event = DoseEvent {
      id: 1,
      at: at("2024-01-15-08-00"),
      kind: DoseKind::BasalRate,
      rate_or_amount: Some(0.8),
      carbs: None,
      duration_minutes: 30,
      label: "Temp Basal".to_string(),
    };
    let (status, _) = oneshot_json(
      state.clone(),
      "PUT",
      "/put/insulin",
      Some(&token),
      Some(serde_json::to_value(&event).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
      oneshot_json(state, "GET", "/get/insulin/last", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "basal_rate");
    assert_eq!(body["duration_minutes"], 30);
  }

  // ── Device ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn device_insert_then_update_in_place() {
    let state = make_state().await;
    let token = issue_token(state.clone()).await;

    let (status, _) =
      oneshot_json(state.clone(), "GET", "/get/device/last", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let snapshot = DeviceSnapshot {
      at: Some(at("2024-01-15-08-00")),
      pump_battery: Some(45),
      names: DeviceNames {
        pump_name: "Medtronic 715".to_string(),
        ..DeviceNames::default()
      },
      ..DeviceSnapshot::default()
    };
    let (status, _) = oneshot_json(
      state.clone(),
      "PUT",
      "/put/device",
      Some(&token),
      Some(serde_json::to_value(&snapshot).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut updated = snapshot.clone();
    updated.pump_battery = Some(40);
    let (status, _) = oneshot_json(
      state.clone(),
      "POST",
      "/post/device",
      Some(&token),
      Some(serde_json::to_value(&updated).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
      oneshot_json(state, "GET", "/get/device/last", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pump_battery"], 40);
    assert_eq!(body["pump_name"], "Medtronic 715");
  }

  // ── Command passthrough ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn command_passthrough_runs_cursor_reads() {
    let state = make_state().await;
    let token = issue_token(state.clone()).await;

    for (id, minute, value) in [(1, "2024-01-15-08-00", 8.9), (2, "2024-01-15-08-05", 9.4)] {
      let (status, _) = oneshot_json(
        state.clone(),
        "PUT",
        "/put/sugar",
        Some(&token),
        Some(serde_json::to_value(sample(id, minute, value)).unwrap()),
      )
      .await;
      assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = oneshot_json(
      state,
      "PUT",
      "/put/command",
      Some(&token),
      Some(json!({
        "query": "SELECT id, value FROM glucose ORDER BY at DESC LIMIT ?1",
        "params": [1],
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([[2, 9.4]]));
  }
}
