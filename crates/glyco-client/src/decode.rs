//! Decoding of command-passthrough result rows into record types.
//!
//! `/put/command` returns rows as positional JSON arrays matching the SELECT
//! column order, so decoding is positional too.

use glyco_core::{
  record::{DoseEvent, DoseKind, GlucoseSample},
  time::CanonicalTime,
};
use serde_json::Value;

use crate::{Error, Result};

fn int_col(row: &[Value], idx: usize) -> Result<i64> {
  row
    .get(idx)
    .and_then(Value::as_i64)
    .ok_or_else(|| Error::Decode(format!("column {idx}: expected integer")))
}

fn real_col(row: &[Value], idx: usize) -> Result<f64> {
  row
    .get(idx)
    .and_then(Value::as_f64)
    .ok_or_else(|| Error::Decode(format!("column {idx}: expected number")))
}

fn text_col(row: &[Value], idx: usize) -> Result<String> {
  row
    .get(idx)
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| Error::Decode(format!("column {idx}: expected text")))
}

fn opt_real_col(row: &[Value], idx: usize) -> Result<Option<f64>> {
  match row.get(idx) {
    None | Some(Value::Null) => Ok(None),
    Some(v) => v
      .as_f64()
      .map(Some)
      .ok_or_else(|| Error::Decode(format!("column {idx}: expected number or null"))),
  }
}

/// Row shape: `id, at, value, source_device, trend, difference`.
pub fn glucose_from_row(row: &[Value]) -> Result<GlucoseSample> {
  Ok(GlucoseSample {
    id:            int_col(row, 0)?,
    at:            CanonicalTime::from_epoch_seconds(int_col(row, 1)?),
    value:         real_col(row, 2)?,
    source_device: text_col(row, 3)?,
    trend:         text_col(row, 4)?,
    difference:    text_col(row, 5)?,
  })
}

/// Row shape: `id, at, kind, rate_or_amount, carbs, duration_minutes, label`.
pub fn dose_from_row(row: &[Value]) -> Result<DoseEvent> {
  let kind_tag = text_col(row, 2)?;
  let kind: DoseKind = serde_json::from_value(Value::String(kind_tag.clone()))
    .map_err(|_| Error::Decode(format!("unknown dose kind {kind_tag:?}")))?;
  Ok(DoseEvent {
    id:               int_col(row, 0)?,
    at:               CanonicalTime::from_epoch_seconds(int_col(row, 1)?),
    kind,
    rate_or_amount:   opt_real_col(row, 3)?,
    carbs:            opt_real_col(row, 4)?,
    duration_minutes: int_col(row, 5)?,
    label:            text_col(row, 6)?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn glucose_rows_decode_positionally() {
    let row = vec![json!(7), json!(1_705_305_600), json!(9.4), json!("cgm"), json!("Flat"), json!("+0.5")];
    let sample = glucose_from_row(&row).unwrap();
    assert_eq!(sample.id, 7);
    assert_eq!(sample.value, 9.4);
    assert_eq!(sample.at.epoch_seconds(), 1_705_305_600);
    assert_eq!(sample.difference, "+0.5");
  }

  #[test]
  fn dose_rows_decode_kind_tags_and_nulls() {
    let row = vec![
      json!(3),
      json!(1_705_305_600),
      json!("basal_rate"),
      json!(0.8),
      Value::Null,
      json!(30),
      json!("Temp Basal"),
    ];
    let event = dose_from_row(&row).unwrap();
    assert_eq!(event.kind, DoseKind::BasalRate);
    assert_eq!(event.rate_or_amount, Some(0.8));
    assert_eq!(event.carbs, None);

    let bad = vec![json!(3), json!(0), json!("mystery"), Value::Null, Value::Null, json!(0), json!("x")];
    assert!(matches!(dose_from_row(&bad), Err(Error::Decode(_))));
  }

  #[test]
  fn truncated_rows_fail_to_decode() {
    let row = vec![json!(7), json!(1_705_305_600)];
    assert!(glucose_from_row(&row).is_err());
  }
}
