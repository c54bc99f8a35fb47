//! The reconciliation engine: which fetched records are new, what ids they
//! get, and what actually reaches the store.
//!
//! Each stream reconciles independently against a cursor recomputed from the
//! table tail at the start of its pass. Batches arrive newest-first and are
//! processed oldest-first. Admitted records are written one at a time; a
//! failed write abandons the remainder of that stream's batch (the next
//! cycle re-reads the cursor and catches up), while sibling streams are
//! unaffected.

use glyco_core::{
  record::{
    DeviceSnapshot, DoseEvent, GlucoseSample, NewDose, NewGlucose,
    PartialDeviceFields, SyncCursor,
  },
  sequence::IdSequencer,
  store::TelemetryStore,
};

use crate::{Error, Result, SyncConfig, report::StreamReport};

// ─── Difference serialization ────────────────────────────────────────────────

/// Serialize a glucose delta: explicit `+` for positive, bare numeral for
/// zero or negative. Downstream trend logic keys off this exact shape.
pub fn format_difference(delta: f64) -> String {
  let rounded = (delta * 10.0).round() / 10.0;
  if rounded > 0.0 {
    format!("+{rounded:.1}")
  } else {
    // Adding 0.0 folds a negative zero into plain zero before printing.
    format!("{:.1}", rounded + 0.0)
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// One reconciliation pass over the three streams, sharing a store and the
/// sync configuration. Construction is free; the engine holds no state of
/// its own — every pass re-derives its cursor from the store.
pub struct ReconciliationEngine<'a, S> {
  store:  &'a S,
  config: &'a SyncConfig,
}

impl<'a, S: TelemetryStore> ReconciliationEngine<'a, S> {
  pub fn new(store: &'a S, config: &'a SyncConfig) -> Self {
    Self { store, config }
  }

  // ── Glucose ───────────────────────────────────────────────────────────

  /// Admission: strictly newer than the cursor. The prior committed value
  /// seeds the difference computation; on an empty table every record is
  /// admitted from the configured floor id and the first difference is
  /// `"0.0"`.
  pub async fn reconcile_glucose(
    &self,
    batch: Vec<NewGlucose>,
    pre_skipped: usize,
  ) -> Result<StreamReport> {
    let tail = self.store.glucose_tail(2).await.map_err(Error::store)?;
    let cursor = SyncCursor::from_glucose(&tail);

    let mut seq = IdSequencer::resume(cursor.last_id, self.config.id_floor);
    let mut last_at = cursor.last_at;
    let mut prev_value = cursor.last_value;
    let mut report = StreamReport { skipped: pre_skipped, ..StreamReport::default() };

    for item in batch.into_iter().rev() {
      if last_at.is_some_and(|t| item.at <= t) {
        report.skipped += 1;
        continue;
      }

      let difference = match prev_value {
        Some(prev) => format_difference(item.value - prev),
        None => "0.0".to_string(),
      };
      let id = seq.next();
      let at = item.at;
      let value = item.value;
      let sample = GlucoseSample::from_new(id, item, difference);

      if let Err(e) = self.store.insert_glucose(sample).await {
        tracing::warn!(error = %e, id, "glucose write failed, abandoning batch remainder");
        report.failed += 1;
        break;
      }
      report.admitted += 1;
      last_at = Some(at);
      prev_value = Some(value);
    }

    Ok(report)
  }

  // ── Dose ──────────────────────────────────────────────────────────────

  /// Admission: newer than or equal to the cursor. On exact equality the
  /// committed last row is re-read and compared field-wise: a full payload
  /// match is the upstream re-delivering an in-progress event and the
  /// candidate is silently dropped; any refinement is admitted as a new
  /// row.
  pub async fn reconcile_dose(
    &self,
    batch: Vec<NewDose>,
    pre_skipped: usize,
  ) -> Result<StreamReport> {
    let tail = self.store.dose_tail(1).await.map_err(Error::store)?;
    let cursor = SyncCursor::from_dose(&tail);

    let mut seq = IdSequencer::resume(cursor.last_id, self.config.id_floor);
    let mut last_at = cursor.last_at;
    let mut report = StreamReport { skipped: pre_skipped, ..StreamReport::default() };

    for item in batch.into_iter().rev() {
      if last_at.is_some_and(|t| item.at < t) {
        report.skipped += 1;
        continue;
      }
      if last_at.is_some_and(|t| item.at == t) {
        let current = match self.store.dose_tail(1).await {
          Ok(rows) => rows,
          Err(e) => {
            tracing::warn!(error = %e, "dose duplicate check failed, abandoning batch remainder");
            report.failed += 1;
            break;
          }
        };
        if current.first().is_some_and(|row| row.payload_matches(&item)) {
          report.skipped += 1;
          continue;
        }
      }

      let id = seq.next();
      let at = item.at;
      let event = DoseEvent::from_new(id, item);

      if let Err(e) = self.store.insert_dose(event).await {
        tracing::warn!(error = %e, id, "dose write failed, abandoning batch remainder");
        report.failed += 1;
        break;
      }
      report.admitted += 1;
      last_at = Some(at);
    }

    Ok(report)
  }

  // ── Device ────────────────────────────────────────────────────────────

  /// No timestamp gating: the reduced delta is always written. The only
  /// decision is INSERT (first-ever row) versus UPDATE in place — the
  /// device table never grows past one row. Absent fields keep their
  /// persisted values; static names are refreshed from configuration.
  pub async fn reconcile_device(
    &self,
    merged: PartialDeviceFields,
  ) -> Result<StreamReport> {
    let existing = self.store.device_snapshot().await.map_err(Error::store)?;
    let mut report = StreamReport::default();

    let write = match existing {
      Some(mut snapshot) => {
        snapshot.absorb(&merged);
        snapshot.names = self.config.names.clone();
        self.store.update_device(snapshot).await
      }
      None => {
        let mut snapshot = DeviceSnapshot::with_names(self.config.names.clone());
        snapshot.absorb(&merged);
        self.store.insert_device(snapshot).await
      }
    };

    match write {
      Ok(()) => report.admitted += 1,
      Err(e) => {
        tracing::warn!(error = %e, "device write failed");
        report.failed += 1;
      }
    }
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::format_difference;

  #[test]
  fn positive_delta_carries_explicit_plus() {
    assert_eq!(format_difference(5.3 - 5.0), "+0.3");
  }

  #[test]
  fn negative_delta_is_bare() {
    assert_eq!(format_difference(5.0 - 5.3), "-0.3");
  }

  #[test]
  fn zero_delta_has_no_sign() {
    assert_eq!(format_difference(0.0), "0.0");
    assert_eq!(format_difference(5.3 - 5.3), "0.0");
    // A tiny negative float rounds to zero, not to "-0.0".
    assert_eq!(format_difference(-0.0001), "0.0");
  }
}
