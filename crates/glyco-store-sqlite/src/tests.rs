//! Integration tests for `SqliteStore` against an in-memory database.

use glyco_core::{
  record::{DeviceNames, DeviceSnapshot, DoseEvent, DoseKind, GlucoseSample},
  store::{CommandStore, TelemetryStore},
  time::CanonicalTime,
};
use serde_json::json;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn at(compact: &str) -> CanonicalTime {
  CanonicalTime::parse_compact(compact).unwrap()
}

fn sample(id: i64, compact: &str, value: f64, difference: &str) -> GlucoseSample {
  GlucoseSample {
    id,
    at: at(compact),
    value,
    source_device: "cgm".to_string(),
    trend: "Flat".to_string(),
    difference: difference.to_string(),
  }
}

fn bolus(id: i64, compact: &str, units: f64) -> DoseEvent {
  DoseEvent {
    id,
    at: at(compact),
    kind: DoseKind::BolusInjection,
    rate_or_amount: Some(units),
    carbs: None,
    duration_minutes: 0,
    label: "Correction Bolus".to_string(),
  }
}

// ─── Glucose ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn glucose_round_trips_through_the_store() {
  let s = store().await;
  s.insert_glucose(sample(1, "2024-01-15-08-00", 8.9, "0.0")).await.unwrap();

  let tail = s.glucose_tail(2).await.unwrap();
  assert_eq!(tail.len(), 1);
  assert_eq!(tail[0], sample(1, "2024-01-15-08-00", 8.9, "0.0"));
}

#[tokio::test]
async fn glucose_tail_is_newest_first() {
  let s = store().await;
  s.insert_glucose(sample(1, "2024-01-15-08-00", 8.9, "0.0")).await.unwrap();
  s.insert_glucose(sample(2, "2024-01-15-08-05", 9.4, "+0.5")).await.unwrap();
  s.insert_glucose(sample(3, "2024-01-15-08-10", 10.0, "+0.6")).await.unwrap();

  let tail = s.glucose_tail(2).await.unwrap();
  assert_eq!(tail.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
}

#[tokio::test]
async fn glucose_lookup_by_id_and_range() {
  let s = store().await;
  s.insert_glucose(sample(1, "2024-01-15-08-00", 8.9, "0.0")).await.unwrap();
  s.insert_glucose(sample(2, "2024-01-15-08-05", 9.4, "+0.5")).await.unwrap();
  s.insert_glucose(sample(3, "2024-01-15-09-00", 10.0, "+0.6")).await.unwrap();

  let found = s.glucose_by_id(2).await.unwrap();
  assert_eq!(found.map(|r| r.value), Some(9.4));
  assert!(s.glucose_by_id(99).await.unwrap().is_none());

  let range = s
    .glucose_range(at("2024-01-15-08-00"), at("2024-01-15-08-30"))
    .await
    .unwrap();
  assert_eq!(range.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn duplicate_glucose_id_is_rejected() {
  let s = store().await;
  s.insert_glucose(sample(1, "2024-01-15-08-00", 8.9, "0.0")).await.unwrap();
  let clash = s.insert_glucose(sample(1, "2024-01-15-08-05", 9.4, "+0.5")).await;
  assert!(clash.is_err());
}

// ─── Dose ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dose_round_trips_with_every_kind() {
  let s = store().await;
  s.insert_dose(DoseEvent {
    id: 1,
    at: at("2024-01-15-08-00"),
    kind: DoseKind::BasalRate,
    rate_or_amount: Some(0.8),
    carbs: None,
    duration_minutes: 30,
    label: "Temp Basal".to_string(),
  })
  .await
  .unwrap();
  s.insert_dose(bolus(2, "2024-01-15-08-05", 1.5)).await.unwrap();
  s.insert_dose(DoseEvent {
    id: 3,
    at: at("2024-01-15-08-10"),
    kind: DoseKind::CarbCorrection,
    rate_or_amount: None,
    carbs: Some(24.0),
    duration_minutes: 0,
    label: "Carb Correction".to_string(),
  })
  .await
  .unwrap();

  let tail = s.dose_tail(3).await.unwrap();
  assert_eq!(tail.len(), 3);
  assert_eq!(tail[0].kind, DoseKind::CarbCorrection);
  assert_eq!(tail[0].carbs, Some(24.0));
  assert_eq!(tail[1].kind, DoseKind::BolusInjection);
  assert_eq!(tail[2].kind, DoseKind::BasalRate);
  assert_eq!(tail[2].duration_minutes, 30);
}

#[tokio::test]
async fn dose_tail_breaks_timestamp_ties_by_id() {
  let s = store().await;
  // The same-minute refinement case: two rows under one timestamp.
  s.insert_dose(bolus(1, "2024-01-15-08-00", 1.0)).await.unwrap();
  s.insert_dose(bolus(2, "2024-01-15-08-00", 1.5)).await.unwrap();

  let tail = s.dose_tail(1).await.unwrap();
  assert_eq!(tail[0].id, 2);
  assert_eq!(tail[0].rate_or_amount, Some(1.5));
}

#[tokio::test]
async fn dose_range_is_ascending() {
  let s = store().await;
  s.insert_dose(bolus(1, "2024-01-15-08-00", 1.0)).await.unwrap();
  s.insert_dose(bolus(2, "2024-01-15-09-00", 1.5)).await.unwrap();
  s.insert_dose(bolus(3, "2024-01-15-10-00", 2.0)).await.unwrap();

  let range = s
    .dose_range(at("2024-01-15-08-30"), at("2024-01-15-10-30"))
    .await
    .unwrap();
  assert_eq!(range.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);
}

// ─── Device ──────────────────────────────────────────────────────────────────

fn snapshot() -> DeviceSnapshot {
  DeviceSnapshot {
    at: Some(at("2024-01-15-08-00")),
    phone_battery: Some(81),
    transmitter_battery: Some(62),
    pump_battery: Some(45),
    pump_cartridge_units: Some(112.5),
    pump_reported_model: Some("Medtronic 715".to_string()),
    cannula_changed_at: None,
    sensor_changed_at: None,
    reservoir_changed_at: None,
    names: DeviceNames {
      pump_name: "Medtronic 715".to_string(),
      phone_name: "iPhone 12 mini".to_string(),
      transmitter_name: "Bubble Nano".to_string(),
      insulin_name: "NovoRapid".to_string(),
      sensor_name: "Libre 2".to_string(),
    },
  }
}

#[tokio::test]
async fn device_snapshot_is_none_until_first_insert() {
  let s = store().await;
  assert!(s.device_snapshot().await.unwrap().is_none());

  s.insert_device(snapshot()).await.unwrap();
  let read = s.device_snapshot().await.unwrap().unwrap();
  assert_eq!(read, snapshot());
}

#[tokio::test]
async fn device_update_mutates_the_single_row() {
  let s = store().await;
  s.insert_device(snapshot()).await.unwrap();

  let mut updated = snapshot();
  updated.pump_battery = Some(40);
  updated.at = Some(at("2024-01-15-08-05"));
  s.update_device(updated.clone()).await.unwrap();

  let read = s.device_snapshot().await.unwrap().unwrap();
  assert_eq!(read, updated);

  // Still exactly one row.
  let rows = s
    .raw_query("SELECT COUNT(*) FROM device".to_string(), vec![])
    .await
    .unwrap();
  assert_eq!(rows, vec![vec![json!(1)]]);
}

#[tokio::test]
async fn second_device_insert_is_rejected() {
  let s = store().await;
  s.insert_device(snapshot()).await.unwrap();
  assert!(s.insert_device(snapshot()).await.is_err());
}

// ─── Raw command queries ─────────────────────────────────────────────────────

#[tokio::test]
async fn raw_query_returns_rows_as_json_arrays() {
  let s = store().await;
  s.insert_glucose(sample(1, "2024-01-15-08-00", 8.9, "0.0")).await.unwrap();
  s.insert_glucose(sample(2, "2024-01-15-08-05", 9.4, "+0.5")).await.unwrap();

  let rows = s
    .raw_query(
      "SELECT id, value, difference FROM glucose ORDER BY at DESC LIMIT ?1".to_string(),
      vec![json!(1)],
    )
    .await
    .unwrap();
  assert_eq!(rows, vec![vec![json!(2), json!(9.4), json!("+0.5")]]);
}

#[tokio::test]
async fn raw_query_with_no_result_rows_is_empty() {
  let s = store().await;
  let rows = s
    .raw_query("SELECT id FROM glucose".to_string(), vec![])
    .await
    .unwrap();
  assert!(rows.is_empty());
}
