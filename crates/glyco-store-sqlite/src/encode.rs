//! Encoding and decoding between domain types and SQLite column values.
//!
//! Timestamps are epoch-second integers, dose kinds are short text tags,
//! everything else maps onto native column types directly.

use glyco_core::{
  record::{DeviceNames, DeviceSnapshot, DoseEvent, DoseKind, GlucoseSample},
  time::CanonicalTime,
};

use crate::{Error, Result};

// ─── DoseKind ────────────────────────────────────────────────────────────────

pub fn encode_dose_kind(kind: DoseKind) -> &'static str {
  match kind {
    DoseKind::BasalRate => "basal_rate",
    DoseKind::BolusInjection => "bolus_injection",
    DoseKind::CarbCorrection => "carb_correction",
  }
}

pub fn decode_dose_kind(s: &str) -> Result<DoseKind> {
  match s {
    "basal_rate" => Ok(DoseKind::BasalRate),
    "bolus_injection" => Ok(DoseKind::BolusInjection),
    "carb_correction" => Ok(DoseKind::CarbCorrection),
    other => Err(Error::UnknownDoseKind(other.to_string())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `glucose` row.
pub struct RawGlucose {
  pub id:            i64,
  pub at:            i64,
  pub value:         f64,
  pub source_device: String,
  pub trend:         String,
  pub difference:    String,
}

impl RawGlucose {
  pub fn into_sample(self) -> GlucoseSample {
    GlucoseSample {
      id:            self.id,
      at:            CanonicalTime::from_epoch_seconds(self.at),
      value:         self.value,
      source_device: self.source_device,
      trend:         self.trend,
      difference:    self.difference,
    }
  }
}

/// Raw values read directly from a `dose` row.
pub struct RawDose {
  pub id:               i64,
  pub at:               i64,
  pub kind:             String,
  pub rate_or_amount:   Option<f64>,
  pub carbs:            Option<f64>,
  pub duration_minutes: i64,
  pub label:            String,
}

impl RawDose {
  pub fn into_event(self) -> Result<DoseEvent> {
    Ok(DoseEvent {
      id:               self.id,
      at:               CanonicalTime::from_epoch_seconds(self.at),
      kind:             decode_dose_kind(&self.kind)?,
      rate_or_amount:   self.rate_or_amount,
      carbs:            self.carbs,
      duration_minutes: self.duration_minutes,
      label:            self.label,
    })
  }
}

/// Raw values read directly from the singleton `device` row.
pub struct RawDevice {
  pub at:                   Option<i64>,
  pub phone_battery:        Option<i64>,
  pub transmitter_battery:  Option<i64>,
  pub pump_battery:         Option<i64>,
  pub pump_cartridge_units: Option<f64>,
  pub pump_reported_model:  Option<String>,
  pub cannula_changed_at:   Option<i64>,
  pub sensor_changed_at:    Option<i64>,
  pub reservoir_changed_at: Option<i64>,
  pub pump_name:            String,
  pub phone_name:           String,
  pub transmitter_name:     String,
  pub insulin_name:         String,
  pub sensor_name:          String,
}

impl RawDevice {
  pub fn into_snapshot(self) -> DeviceSnapshot {
    DeviceSnapshot {
      at:                   self.at.map(CanonicalTime::from_epoch_seconds),
      phone_battery:        self.phone_battery,
      transmitter_battery:  self.transmitter_battery,
      pump_battery:         self.pump_battery,
      pump_cartridge_units: self.pump_cartridge_units,
      pump_reported_model:  self.pump_reported_model,
      cannula_changed_at:   self.cannula_changed_at.map(CanonicalTime::from_epoch_seconds),
      sensor_changed_at:    self.sensor_changed_at.map(CanonicalTime::from_epoch_seconds),
      reservoir_changed_at: self.reservoir_changed_at.map(CanonicalTime::from_epoch_seconds),
      names:                DeviceNames {
        pump_name:        self.pump_name,
        phone_name:       self.phone_name,
        transmitter_name: self.transmitter_name,
        insulin_name:     self.insulin_name,
        sensor_name:      self.sensor_name,
      },
    }
  }
}

// ─── JSON bridge (raw command queries) ───────────────────────────────────────

/// Map a JSON parameter onto a SQLite value. Arrays and objects are bound as
/// their serialized text.
pub fn json_to_sql(value: serde_json::Value) -> rusqlite::types::Value {
  use rusqlite::types::Value as Sql;
  match value {
    serde_json::Value::Null => Sql::Null,
    serde_json::Value::Bool(b) => Sql::Integer(i64::from(b)),
    serde_json::Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        Sql::Integer(i)
      } else {
        Sql::Real(n.as_f64().unwrap_or(0.0))
      }
    }
    serde_json::Value::String(s) => Sql::Text(s),
    other => Sql::Text(other.to_string()),
  }
}

/// Map a SQLite column value onto JSON for the command-query response.
pub fn sql_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
  use rusqlite::types::ValueRef;
  match value {
    ValueRef::Null => serde_json::Value::Null,
    ValueRef::Integer(i) => serde_json::Value::from(i),
    ValueRef::Real(f) => serde_json::Value::from(f),
    ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(_) => serde_json::Value::Null,
  }
}
