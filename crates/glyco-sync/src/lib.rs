//! The glyco ingestion engine.
//!
//! Classifies raw upstream batches into canonical records, reconciles them
//! against the last persisted state per stream, and commits only the delta.
//! Generic over the [`glyco_core::store::TelemetryStore`] and
//! [`glyco_core::source::TelemetrySource`] traits, so the same engine serves
//! a local SQLite deployment and the three-tier remote-store split.

pub mod classify;
pub mod device;
pub mod driver;
pub mod engine;
pub mod error;
pub mod report;

pub use error::{Error, Result};

use glyco_core::record::DeviceNames;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime sync configuration, deserialised from the `[sync]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Per-stream enable switches. A disabled stream is not fetched and its
  /// cycle outcome slot stays `None`.
  pub glucose:              bool,
  pub dose:                 bool,
  pub device:               bool,
  /// Result-count limit passed to the upstream API. Raise after downtime so
  /// the fetch window still covers the gap.
  pub fetch_limit:          usize,
  /// Convert upstream mg/dL readings to mmol/L.
  pub use_mmol:             bool,
  /// Nonzero temp-basal durations shorter than this are floored to it.
  pub min_duration_minutes: i64,
  /// Hour offset applied to upstream wall-clock timestamps.
  pub offset_hours:         i32,
  /// First id minted on an empty table.
  pub id_floor:             i64,
  /// Uploader `name` value that marks a transmitter ping.
  pub transmitter_tag:      String,
  /// Seconds between cycles in looping mode.
  pub interval_secs:        u64,
  /// Operator-configured device display names.
  pub names:                DeviceNames,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      glucose:              true,
      dose:                 true,
      device:               true,
      fetch_limit:          100,
      use_mmol:             true,
      min_duration_minutes: 30,
      offset_hours:         0,
      id_floor:             1,
      transmitter_tag:      "transmitter".to_string(),
      interval_secs:        60,
      names:                DeviceNames::default(),
    }
  }
}
