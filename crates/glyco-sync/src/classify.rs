//! Classification of loosely-typed upstream records into canonical variants.
//!
//! The upstream API has no fixed schema: which keys are present determines
//! what a record is. Records missing required keys are skipped, never
//! erred — tolerance for upstream schema drift is deliberate, and the batch
//! helpers surface skip counts for the debug log.

use glyco_core::{
  record::{DoseKind, NewDose, NewGlucose, PartialDeviceFields},
  time::TimeNormalizer,
};
use serde_json::Value;

use crate::{
  SyncConfig,
  device::{UploaderOwner, attribute_uploader},
};

/// mg/dL per mmol/L.
const MMOL_DIVISOR: f64 = 18.0;

fn round1(v: f64) -> f64 { (v * 10.0).round() / 10.0 }

fn str_field(raw: &Value, key: &str) -> String {
  raw
    .get(key)
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string()
}

// ─── RecordClassifier ────────────────────────────────────────────────────────

/// Maps heterogeneous upstream event shapes into canonical record variants.
#[derive(Debug, Clone)]
pub struct RecordClassifier {
  normalizer:           TimeNormalizer,
  use_mmol:             bool,
  min_duration_minutes: i64,
  transmitter_tag:      String,
}

impl RecordClassifier {
  pub fn new(config: &SyncConfig) -> Self {
    Self {
      normalizer:           TimeNormalizer::new(config.offset_hours),
      use_mmol:             config.use_mmol,
      min_duration_minutes: config.min_duration_minutes,
      transmitter_tag:      config.transmitter_tag.clone(),
    }
  }

  // ── Glucose ───────────────────────────────────────────────────────────

  /// `None` when `dateString` or `sgv` is missing, the timestamp is
  /// malformed, or the reading is non-positive.
  pub fn classify_glucose(&self, raw: &Value) -> Option<NewGlucose> {
    let date = raw.get("dateString")?.as_str()?;
    let sgv = raw.get("sgv")?.as_f64()?;
    if sgv <= 0.0 {
      return None;
    }
    let at = self.normalizer.normalize(date).ok()?;
    let value = if self.use_mmol { round1(sgv / MMOL_DIVISOR) } else { sgv };
    Some(NewGlucose {
      at,
      value,
      source_device: str_field(raw, "device"),
      trend: str_field(raw, "direction"),
    })
  }

  // ── Dose ──────────────────────────────────────────────────────────────

  /// Event kind is an exact match on the upstream `eventType` label;
  /// unrecognized labels are skipped.
  pub fn classify_dose(&self, raw: &Value) -> Option<NewDose> {
    let created = raw.get("created_at")?.as_str()?;
    let at = self.normalizer.normalize(created).ok()?;
    let label = raw.get("eventType")?.as_str()?;

    match label {
      "Temp Basal" => Some(NewDose {
        at,
        kind: DoseKind::BasalRate,
        rate_or_amount: raw.get("rate").and_then(Value::as_f64),
        carbs: None,
        duration_minutes: self.floor_duration(raw.get("duration").and_then(Value::as_f64)),
        label: label.to_string(),
      }),
      "Bolus" | "Correction Bolus" => Some(NewDose {
        at,
        kind: DoseKind::BolusInjection,
        rate_or_amount: raw.get("insulin").and_then(Value::as_f64),
        carbs: None,
        duration_minutes: 0,
        label: label.to_string(),
      }),
      "Carb Correction" => Some(NewDose {
        at,
        kind: DoseKind::CarbCorrection,
        rate_or_amount: None,
        carbs: raw.get("carbs").and_then(Value::as_f64),
        duration_minutes: 0,
        label: label.to_string(),
      }),
      _ => None,
    }
  }

  /// Present-and-nonzero durations are floored at the configured minimum;
  /// absent or zero normalizes to 0.
  fn floor_duration(&self, raw: Option<f64>) -> i64 {
    match raw {
      Some(d) if d != 0.0 => (d as i64).max(self.min_duration_minutes),
      _ => 0,
    }
  }

  // ── Device ────────────────────────────────────────────────────────────

  /// Extract whatever snapshot fields this ping carries. No error case:
  /// a ping that supplies nothing yields an empty field set.
  pub fn classify_device_ping(&self, raw: &Value) -> PartialDeviceFields {
    let mut fields = PartialDeviceFields::default();
    let pump = raw.get("pump");

    if let Some(pct) = pump
      .and_then(|p| p.get("battery"))
      .and_then(|b| b.get("percent"))
      .and_then(Value::as_i64)
    {
      fields.pump_battery = Some(pct);
    }

    if let Some(units) = pump.and_then(|p| p.get("reservoir")).and_then(Value::as_f64) {
      // The cartridge reading, its timestamp, and the reported model travel
      // together: they all describe the same pump ping.
      fields.pump_cartridge_units = Some(units);
      fields.at = raw
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| self.normalizer.normalize(s).ok());
      fields.pump_reported_model = pump.and_then(reported_model);
    }

    if let Some(uploader) = raw.get("uploader")
      && let Some(pct) = uploader.get("battery").and_then(Value::as_i64)
    {
      let name = uploader.get("name").and_then(Value::as_str);
      let has_timestamp = uploader.get("timestamp").is_some_and(|v| !v.is_null());
      match attribute_uploader(name, has_timestamp, &self.transmitter_tag) {
        UploaderOwner::Transmitter => fields.transmitter_battery = Some(pct),
        UploaderOwner::Phone => fields.phone_battery = Some(pct),
      }
    }

    fields
  }

  // ── Batch helpers ─────────────────────────────────────────────────────

  pub fn glucose_batch(&self, raw: &[Value]) -> (Vec<NewGlucose>, usize) {
    let mut out = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for entry in raw {
      match self.classify_glucose(entry) {
        Some(g) => out.push(g),
        None => skipped += 1,
      }
    }
    if skipped > 0 {
      tracing::debug!(skipped, "dropped unclassifiable glucose entries");
    }
    (out, skipped)
  }

  pub fn dose_batch(&self, raw: &[Value]) -> (Vec<NewDose>, usize) {
    let mut out = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for entry in raw {
      match self.classify_dose(entry) {
        Some(d) => out.push(d),
        None => skipped += 1,
      }
    }
    if skipped > 0 {
      tracing::debug!(skipped, "dropped unrecognized or unclassifiable treatments");
    }
    (out, skipped)
  }
}

/// `manufacturer` and `model` joined with a space; `None` if neither is set.
fn reported_model(pump: &Value) -> Option<String> {
  let manufacturer = pump.get("manufacturer").and_then(Value::as_str);
  let model = pump.get("model").and_then(Value::as_str);
  match (manufacturer, model) {
    (Some(man), Some(mo)) => Some(format!("{man} {mo}")),
    (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
    (None, None) => None,
  }
}
