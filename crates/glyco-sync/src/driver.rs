//! The sync driver: one fetch-reconcile-commit cycle, and the repeating
//! variant.
//!
//! Fetching is fan-out/fan-in — the enabled streams are requested
//! concurrently and the cycle blocks until all three complete. Reconcile and
//! commit are strictly sequential: the store is a single-owner resource and
//! cycles never overlap. Transport failures degrade to an empty batch for
//! that stream ("empty means nothing new"); only cursor-load failures abort
//! a stream, and then only for the current cycle.

use std::{future::Future, time::Duration};

use glyco_core::{source::TelemetrySource, store::TelemetryStore};
use serde_json::Value;

use crate::{
  SyncConfig,
  classify::RecordClassifier,
  device::reduce_pings,
  engine::ReconciliationEngine,
  error::Error,
  report::{CycleOutcome, StreamReport, StreamResult},
};

pub struct SyncDriver<F, S> {
  source: F,
  store:  S,
  config: SyncConfig,
}

impl<F, S> SyncDriver<F, S>
where
  F: TelemetrySource,
  S: TelemetryStore,
{
  pub fn new(source: F, store: S, config: SyncConfig) -> Self {
    Self { source, store, config }
  }

  pub fn config(&self) -> &SyncConfig { &self.config }

  /// The owned store, for read-back surfaces sharing the driver's handle.
  pub fn store(&self) -> &S { &self.store }

  /// Run one cycle. Never fails: per-record and per-stream problems are
  /// absorbed into the outcome tallies, which is what keeps the repeating
  /// variant alive across bad cycles.
  pub async fn run_once(&self) -> CycleOutcome {
    let limit = self.config.fetch_limit;

    let (glucose_raw, dose_raw, device_raw) = tokio::join!(
      fetch_stream("glucose", self.config.glucose, self.source.fetch_glucose(limit)),
      fetch_stream("dose", self.config.dose, self.source.fetch_treatments(limit)),
      fetch_stream("device", self.config.device, self.source.fetch_device_status(limit)),
    );

    let classifier = RecordClassifier::new(&self.config);
    let engine = ReconciliationEngine::new(&self.store, &self.config);

    let glucose = match glucose_raw {
      Some(rows) => {
        let (batch, skipped) = classifier.glucose_batch(&rows);
        Some(finish_stream("glucose", engine.reconcile_glucose(batch, skipped).await))
      }
      None => None,
    };

    let dose = match dose_raw {
      Some(rows) => {
        let (batch, skipped) = classifier.dose_batch(&rows);
        Some(finish_stream("dose", engine.reconcile_dose(batch, skipped).await))
      }
      None => None,
    };

    let device = match device_raw {
      Some(rows) => {
        let pings: Vec<_> =
          rows.iter().map(|r| classifier.classify_device_ping(r)).collect();
        let merged = reduce_pings(&pings);
        Some(finish_stream("device", engine.reconcile_device(merged).await))
      }
      None => None,
    };

    CycleOutcome { glucose, dose, device }
  }

  /// Run cycles forever, sleeping `interval` between them. The sleep is
  /// measured from cycle end, so the period drifts by the cycle duration;
  /// that matches the reference behavior and is acceptable here. Shutdown
  /// is cooperative: callers cancel between cycles, never mid-flight.
  pub async fn run_forever(&self, interval: Duration) {
    loop {
      let outcome = self.run_once().await;
      tracing::info!(%outcome, "sync cycle complete");
      tokio::time::sleep(interval).await;
    }
  }
}

/// `None` if the stream is disabled; otherwise the fetched batch, with
/// transport failures logged and degraded to an empty batch.
async fn fetch_stream<Fut, E>(
  name: &'static str,
  enabled: bool,
  fetch: Fut,
) -> Option<Vec<Value>>
where
  Fut: Future<Output = Result<Vec<Value>, E>>,
  E: std::fmt::Display,
{
  if !enabled {
    return None;
  }
  match fetch.await {
    Ok(rows) => Some(rows),
    Err(e) => {
      tracing::debug!(stream = name, error = %e, "fetch failed, treating as empty batch");
      Some(Vec::new())
    }
  }
}

fn finish_stream(
  name: &'static str,
  result: Result<StreamReport, Error>,
) -> StreamResult {
  match result {
    Ok(report) => StreamResult { ok: true, report },
    Err(e) => {
      tracing::warn!(stream = name, error = %e, "stream aborted for this cycle");
      StreamResult { ok: false, report: StreamReport::default() }
    }
  }
}
