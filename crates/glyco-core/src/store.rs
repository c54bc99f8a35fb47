//! The `TelemetryStore` trait and the privileged raw-query capability.
//!
//! The traits are implemented by storage backends (`glyco-store-sqlite`
//! locally, `glyco-client` over the REST facade). The reconciliation engine
//! depends on this abstraction, not on any concrete backend, which is what
//! lets one engine serve every deployment shape.

use std::future::Future;

use crate::{
  record::{DeviceSnapshot, DoseEvent, GlucoseSample},
  time::CanonicalTime,
};

/// Abstraction over a glyco storage backend.
///
/// Tail reads return rows newest-first. Glucose and dose rows are
/// append-only; the device snapshot is a singleton that is inserted exactly
/// once and updated in place thereafter. The core assumes single-writer
/// operation — it never issues concurrent transactions.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait TelemetryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Cursor reads ──────────────────────────────────────────────────────

  /// The most recent `limit` glucose rows, newest-first.
  fn glucose_tail(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<GlucoseSample>, Self::Error>> + Send + '_;

  /// The most recent `limit` dose rows, newest-first.
  fn dose_tail(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DoseEvent>, Self::Error>> + Send + '_;

  /// The singleton device row, if one has ever been written.
  fn device_snapshot(
    &self,
  ) -> impl Future<Output = Result<Option<DeviceSnapshot>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  fn insert_glucose(
    &self,
    sample: GlucoseSample,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_dose(
    &self,
    event: DoseEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// First-ever device write. Callers must have checked that no row exists.
  fn insert_device(
    &self,
    snapshot: DeviceSnapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Update the singleton device row in place.
  fn update_device(
    &self,
    snapshot: DeviceSnapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Read-back (REST facade and console surface) ───────────────────────

  fn glucose_by_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<GlucoseSample>, Self::Error>> + Send + '_;

  /// Rows with `start <= at <= end`, ascending.
  fn glucose_range(
    &self,
    start: CanonicalTime,
    end: CanonicalTime,
  ) -> impl Future<Output = Result<Vec<GlucoseSample>, Self::Error>> + Send + '_;

  fn dose_by_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<DoseEvent>, Self::Error>> + Send + '_;

  fn dose_range(
    &self,
    start: CanonicalTime,
    end: CanonicalTime,
  ) -> impl Future<Output = Result<Vec<DoseEvent>, Self::Error>> + Send + '_;
}

/// Raw parameterized query access — the trusted-caller escape hatch behind
/// `PUT /put/command`. Not part of [`TelemetryStore`] because only backends
/// that own a real SQL connection can offer it.
pub trait CommandStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Execute a parameterized statement and return the result rows as JSON
  /// arrays (empty for statements that return no rows).
  fn raw_query(
    &self,
    query: String,
    params: Vec<serde_json::Value>,
  ) -> impl Future<Output = Result<Vec<Vec<serde_json::Value>>, Self::Error>> + Send + '_;
}
