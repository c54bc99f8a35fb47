//! Record types — the three telemetry streams and their classifier inputs.
//!
//! Persisted rows ([`GlucoseSample`], [`DoseEvent`]) carry an engine-assigned
//! sequential id and are immutable once committed. The `New*` forms are what
//! the classifier produces before reconciliation assigns ids and derived
//! fields. [`DeviceSnapshot`] is not a time series: it is a singleton row,
//! inserted once and updated in place forever after.

use serde::{Deserialize, Serialize};

use crate::time::CanonicalTime;

// ─── Glucose ─────────────────────────────────────────────────────────────────

/// A committed glucose reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSample {
  pub id:            i64,
  pub at:            CanonicalTime,
  /// mg/dL or mmol/L; the unit is fixed by configuration for a deployment.
  pub value:         f64,
  pub source_device: String,
  /// Raw upstream trend code (e.g. `Flat`, `FortyFiveUp`); empty if absent.
  pub trend:         String,
  /// Signed delta from the previous committed value: `"+0.3"`, `"-0.3"`,
  /// `"0.0"`. Positive deltas carry an explicit leading `+`.
  pub difference:    String,
}

/// Classifier output for one glucose entry, before id/difference assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGlucose {
  pub at:            CanonicalTime,
  pub value:         f64,
  pub source_device: String,
  pub trend:         String,
}

impl GlucoseSample {
  pub fn from_new(id: i64, new: NewGlucose, difference: String) -> Self {
    Self {
      id,
      at: new.at,
      value: new.value,
      source_device: new.source_device,
      trend: new.trend,
      difference,
    }
  }
}

// ─── Dose ────────────────────────────────────────────────────────────────────

/// What kind of insulin/carb event a treatment row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseKind {
  BasalRate,
  BolusInjection,
  CarbCorrection,
}

/// A committed insulin or carb event.
///
/// Exactly one of `rate_or_amount` (basal rate or bolus units) and `carbs`
/// is meaningfully populated depending on `kind`; the rest stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
  pub id:               i64,
  pub at:               CanonicalTime,
  pub kind:             DoseKind,
  pub rate_or_amount:   Option<f64>,
  pub carbs:            Option<f64>,
  /// Floored at the configured minimum when present and nonzero, else 0.
  pub duration_minutes: i64,
  /// The upstream event-type string, carried verbatim.
  pub label:            String,
}

/// Classifier output for one treatment entry, before id assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDose {
  pub at:               CanonicalTime,
  pub kind:             DoseKind,
  pub rate_or_amount:   Option<f64>,
  pub carbs:            Option<f64>,
  pub duration_minutes: i64,
  pub label:            String,
}

impl DoseEvent {
  pub fn from_new(id: i64, new: NewDose) -> Self {
    Self {
      id,
      at: new.at,
      kind: new.kind,
      rate_or_amount: new.rate_or_amount,
      carbs: new.carbs,
      duration_minutes: new.duration_minutes,
      label: new.label,
    }
  }

  /// Field-wise equality against a candidate, ignoring id and timestamp.
  ///
  /// Used by the reconciliation equality short-circuit: the upstream API
  /// re-delivers an in-progress temp basal under the same timestamp with
  /// incrementally refined fields, and only a full payload match makes the
  /// candidate a duplicate.
  pub fn payload_matches(&self, candidate: &NewDose) -> bool {
    self.kind == candidate.kind
      && self.rate_or_amount == candidate.rate_or_amount
      && self.carbs == candidate.carbs
      && self.duration_minutes == candidate.duration_minutes
      && self.label == candidate.label
  }
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// Operator-configured display names for the tracked hardware. These are
/// injected from configuration, never read from upstream data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNames {
  #[serde(default)]
  pub pump_name:        String,
  #[serde(default)]
  pub phone_name:       String,
  #[serde(default)]
  pub transmitter_name: String,
  #[serde(default)]
  pub insulin_name:     String,
  #[serde(default)]
  pub sensor_name:      String,
}

/// The latest known state of all tracked devices — a single logical row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
  pub at:                   Option<CanonicalTime>,
  pub phone_battery:        Option<i64>,
  pub transmitter_battery:  Option<i64>,
  pub pump_battery:         Option<i64>,
  pub pump_cartridge_units: Option<f64>,
  /// Manufacturer + model as reported by the pump ping itself.
  pub pump_reported_model:  Option<String>,
  pub cannula_changed_at:   Option<CanonicalTime>,
  pub sensor_changed_at:    Option<CanonicalTime>,
  pub reservoir_changed_at: Option<CanonicalTime>,
  #[serde(flatten)]
  pub names:                DeviceNames,
}

/// The subset of snapshot fields one device-status ping can supply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialDeviceFields {
  pub at:                   Option<CanonicalTime>,
  pub pump_battery:         Option<i64>,
  pub pump_cartridge_units: Option<f64>,
  pub pump_reported_model:  Option<String>,
  pub transmitter_battery:  Option<i64>,
  pub phone_battery:        Option<i64>,
}

impl PartialDeviceFields {
  pub fn is_empty(&self) -> bool {
    self.pump_battery.is_none()
      && self.pump_cartridge_units.is_none()
      && self.transmitter_battery.is_none()
      && self.phone_battery.is_none()
  }
}

impl DeviceSnapshot {
  pub fn with_names(names: DeviceNames) -> Self {
    Self { names, ..Self::default() }
  }

  /// Merge `fields` over this snapshot. Absent fields mean "no update",
  /// never "clear to null".
  pub fn absorb(&mut self, fields: &PartialDeviceFields) {
    if let Some(at) = fields.at {
      self.at = Some(at);
    }
    if let Some(pct) = fields.pump_battery {
      self.pump_battery = Some(pct);
    }
    if let Some(units) = fields.pump_cartridge_units {
      self.pump_cartridge_units = Some(units);
    }
    if let Some(model) = &fields.pump_reported_model {
      self.pump_reported_model = Some(model.clone());
    }
    if let Some(pct) = fields.transmitter_battery {
      self.transmitter_battery = Some(pct);
    }
    if let Some(pct) = fields.phone_battery {
      self.phone_battery = Some(pct);
    }
  }
}

// ─── SyncCursor ──────────────────────────────────────────────────────────────

/// The last-known persisted state of a stream, recomputed from the table
/// tail immediately before every reconciliation pass. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct SyncCursor {
  pub last_id:    Option<i64>,
  pub last_at:    Option<CanonicalTime>,
  /// Prior glucose value; needed to compute the next record's difference.
  pub last_value: Option<f64>,
}

impl SyncCursor {
  pub fn from_glucose(tail: &[GlucoseSample]) -> Self {
    Self {
      last_id:    tail.first().map(|r| r.id),
      last_at:    tail.first().map(|r| r.at),
      last_value: tail.first().map(|r| r.value),
    }
  }

  pub fn from_dose(tail: &[DoseEvent]) -> Self {
    Self {
      last_id:    tail.first().map(|r| r.id),
      last_at:    tail.first().map(|r| r.at),
      last_value: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absorb_keeps_existing_fields_when_absent() {
    let mut snap = DeviceSnapshot {
      phone_battery: Some(77),
      pump_battery: Some(40),
      ..DeviceSnapshot::default()
    };
    snap.absorb(&PartialDeviceFields {
      pump_battery: Some(35),
      ..PartialDeviceFields::default()
    });
    assert_eq!(snap.pump_battery, Some(35));
    assert_eq!(snap.phone_battery, Some(77));
  }

  #[test]
  fn payload_match_ignores_id_and_timestamp() {
    let committed = DoseEvent {
      id:               12,
      at:               CanonicalTime::from_epoch_seconds(1_700_000_000),
      kind:             DoseKind::BasalRate,
      rate_or_amount:   Some(0.8),
      carbs:            None,
      duration_minutes: 30,
      label:            "Temp Basal".to_string(),
    };
    let same_payload = NewDose {
      at:               CanonicalTime::from_epoch_seconds(1_700_000_000),
      kind:             DoseKind::BasalRate,
      rate_or_amount:   Some(0.8),
      carbs:            None,
      duration_minutes: 30,
      label:            "Temp Basal".to_string(),
    };
    assert!(committed.payload_matches(&same_payload));

    let refined = NewDose { duration_minutes: 60, ..same_payload };
    assert!(!committed.payload_matches(&refined));
  }
}
