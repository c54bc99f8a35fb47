//! The raw-query passthrough — a privileged, trusted-caller-only escape
//! hatch used by the remote sync driver for its cursor reads. Never expose
//! this route on a public interface.

use axum::{Json, extract::State, http::HeaderMap};
use glyco_core::store::CommandStore;
use serde::Deserialize;
use serde_json::Value;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CommandBody {
  pub query:  String,
  #[serde(default)]
  pub params: Vec<Value>,
}

/// `PUT /put/command` — execute one parameterized statement and return the
/// result rows as JSON arrays.
pub async fn run<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<CommandBody>,
) -> Result<Json<Vec<Vec<Value>>>, ApiError>
where
  S: CommandStore,
{
  state.tokens.verify_bearer(&headers)?;
  let rows = state
    .store
    .raw_query(body.query, body.params)
    .await
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  Ok(Json(rows))
}
