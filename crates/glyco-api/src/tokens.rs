//! Token issuance and user management handlers.

use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub token_type:   String,
}

/// `POST /token` — exchange a username/password pair for a bearer token.
pub async fn issue<S>(
  State(state): State<AppState<S>>,
  Json(creds): Json<Credentials>,
) -> Result<Json<TokenResponse>, ApiError> {
  if !state.users.verify(&creds.username, &creds.password) {
    return Err(ApiError::Unauthorized);
  }
  let access_token = state.tokens.issue(&creds.username)?;
  tracing::info!(user = %creds.username, "issued bearer token");
  Ok(Json(TokenResponse { access_token, token_type: "bearer".to_string() }))
}

/// `PUT /create/user` — register a new login (authenticated callers only).
pub async fn create_user<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(creds): Json<Credentials>,
) -> Result<Json<Value>, ApiError> {
  state.tokens.verify_bearer(&headers)?;
  state.users.add_user(&creds.username, &creds.password)?;
  tracing::info!(user = %creds.username, "registered new user");
  Ok(Json(json!({ "result": true })))
}
