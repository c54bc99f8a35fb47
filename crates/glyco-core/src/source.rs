//! The `TelemetrySource` trait — the upstream fetch boundary.
//!
//! Each method fetches one stream's raw batch. Elements are loosely-typed
//! JSON objects: which keys are present, not a fixed schema, determines how
//! the classifier treats each record. Batches arrive newest-first.

use std::future::Future;

use serde_json::Value;

/// Abstraction over the upstream telemetry API.
///
/// Implementations map a non-success response to an empty batch ("empty
/// means nothing new") and reserve their error type for transport-level
/// failures, which the sync driver likewise degrades to an empty batch for
/// that stream.
pub trait TelemetrySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Glucose entries (sensor readings), newest-first.
  fn fetch_glucose(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  /// Treatments (basal changes, boluses, carb corrections), newest-first.
  fn fetch_treatments(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  /// Device-status pings, newest-first.
  fn fetch_device_status(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;
}
