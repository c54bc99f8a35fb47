//! Handlers for the record insert and read-back routes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/put/sugar` | Body: full [`GlucoseSample`] |
//! | `PUT`  | `/put/insulin` | Body: full [`DoseEvent`] |
//! | `PUT`  | `/put/device` | First-ever snapshot INSERT |
//! | `POST` | `/post/device` | Snapshot UPDATE in place |
//! | `GET`  | `/get/{sugar,insulin}/last` | Most recent row |
//! | `GET`  | `/get/{sugar,insulin}/id?id=` | Row by id |
//! | `GET`  | `/get/{sugar,insulin}/date?start=&end=` | Ascending range |
//! | `GET`  | `/get/device/last` | The singleton snapshot |
//!
//! Range bounds use the compact `YYYY-MM-DD-HH-MM` form.

use axum::{
  Json,
  extract::{Query, State},
  http::HeaderMap,
};
use glyco_core::{
  record::{DeviceSnapshot, DoseEvent, GlucoseSample},
  store::TelemetryStore,
  time::CanonicalTime,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

// ─── Query params ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IdParams {
  pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DateParams {
  pub start: String,
  pub end:   String,
}

impl DateParams {
  fn bounds(&self) -> Result<(CanonicalTime, CanonicalTime), ApiError> {
    let start = CanonicalTime::parse_compact(&self.start)
      .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let end = CanonicalTime::parse_compact(&self.end)
      .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok((start, end))
  }
}

// ─── Glucose ─────────────────────────────────────────────────────────────────

/// `PUT /put/sugar`
pub async fn put_sugar<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<GlucoseSample>,
) -> Result<Json<Value>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state.store.insert_glucose(body).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "result": true })))
}

/// `GET /get/sugar/last`
pub async fn sugar_last<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Json<GlucoseSample>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  let tail = state.store.glucose_tail(1).await.map_err(ApiError::store)?;
  tail
    .into_iter()
    .next()
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("no glucose rows".to_string()))
}

/// `GET /get/sugar/id?id=…`
pub async fn sugar_by_id<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Query(params): Query<IdParams>,
) -> Result<Json<GlucoseSample>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state
    .store
    .glucose_by_id(params.id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("glucose id {} not found", params.id)))
}

/// `GET /get/sugar/date?start=…&end=…`
pub async fn sugar_by_date<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<GlucoseSample>>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  let (start, end) = params.bounds()?;
  let rows = state
    .store
    .glucose_range(start, end)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Dose ────────────────────────────────────────────────────────────────────

/// `PUT /put/insulin`
pub async fn put_insulin<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<DoseEvent>,
) -> Result<Json<Value>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state.store.insert_dose(body).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "result": true })))
}

/// `GET /get/insulin/last`
pub async fn insulin_last<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Json<DoseEvent>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  let tail = state.store.dose_tail(1).await.map_err(ApiError::store)?;
  tail
    .into_iter()
    .next()
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("no dose rows".to_string()))
}

/// `GET /get/insulin/id?id=…`
pub async fn insulin_by_id<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Query(params): Query<IdParams>,
) -> Result<Json<DoseEvent>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state
    .store
    .dose_by_id(params.id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("dose id {} not found", params.id)))
}

/// `GET /get/insulin/date?start=…&end=…`
pub async fn insulin_by_date<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<DoseEvent>>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  let (start, end) = params.bounds()?;
  let rows = state.store.dose_range(start, end).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// `PUT /put/device` — the first-ever snapshot write.
pub async fn put_device<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<DeviceSnapshot>,
) -> Result<Json<Value>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state.store.insert_device(body).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "result": true })))
}

/// `POST /post/device` — update the singleton row in place.
pub async fn post_device<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<DeviceSnapshot>,
) -> Result<Json<Value>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state.store.update_device(body).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "result": true })))
}

/// `GET /get/device/last`
pub async fn device_last<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Json<DeviceSnapshot>, ApiError>
where
  S: TelemetryStore,
{
  state.tokens.verify_bearer(&headers)?;
  state
    .store
    .device_snapshot()
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("no device row".to_string()))
}
