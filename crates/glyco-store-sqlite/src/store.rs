//! [`SqliteStore`] — the SQLite implementation of [`TelemetryStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use glyco_core::{
  record::{DeviceSnapshot, DoseEvent, GlucoseSample},
  store::{CommandStore, TelemetryStore},
  time::CanonicalTime,
};

use crate::{
  Error, Result,
  encode::{
    RawDevice, RawDose, RawGlucose, encode_dose_kind, json_to_sql, sql_to_json,
  },
  schema::SCHEMA,
};

const GLUCOSE_COLUMNS: &str = "id, at, value, source_device, trend, difference";
const DOSE_COLUMNS: &str = "id, at, kind, rate_or_amount, carbs, duration_minutes, label";
const DEVICE_COLUMNS: &str = "at, phone_battery, transmitter_battery, pump_battery, \
   pump_cartridge_units, pump_reported_model, cannula_changed_at, \
   sensor_changed_at, reservoir_changed_at, pump_name, phone_name, \
   transmitter_name, insulin_name, sensor_name";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A glyco telemetry store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn glucose_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawGlucose> {
    Ok(RawGlucose {
      id:            row.get(0)?,
      at:            row.get(1)?,
      value:         row.get(2)?,
      source_device: row.get(3)?,
      trend:         row.get(4)?,
      difference:    row.get(5)?,
    })
  }

  fn dose_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDose> {
    Ok(RawDose {
      id:               row.get(0)?,
      at:               row.get(1)?,
      kind:             row.get(2)?,
      rate_or_amount:   row.get(3)?,
      carbs:            row.get(4)?,
      duration_minutes: row.get(5)?,
      label:            row.get(6)?,
    })
  }

  fn device_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDevice> {
    Ok(RawDevice {
      at:                   row.get(0)?,
      phone_battery:        row.get(1)?,
      transmitter_battery:  row.get(2)?,
      pump_battery:         row.get(3)?,
      pump_cartridge_units: row.get(4)?,
      pump_reported_model:  row.get(5)?,
      cannula_changed_at:   row.get(6)?,
      sensor_changed_at:    row.get(7)?,
      reservoir_changed_at: row.get(8)?,
      pump_name:            row.get(9)?,
      phone_name:           row.get(10)?,
      transmitter_name:     row.get(11)?,
      insulin_name:         row.get(12)?,
      sensor_name:          row.get(13)?,
    })
  }

  async fn glucose_query(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<GlucoseSample>> {
    let raws: Vec<RawGlucose> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), Self::glucose_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws.into_iter().map(RawGlucose::into_sample).collect())
  }

  async fn dose_query(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<DoseEvent>> {
    let raws: Vec<RawDose> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), Self::dose_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawDose::into_event).collect()
  }
}

// ─── TelemetryStore impl ─────────────────────────────────────────────────────

impl TelemetryStore for SqliteStore {
  type Error = Error;

  // ── Cursor reads ──────────────────────────────────────────────────────────

  async fn glucose_tail(&self, limit: usize) -> Result<Vec<GlucoseSample>> {
    self
      .glucose_query(
        format!(
          "SELECT {GLUCOSE_COLUMNS} FROM glucose ORDER BY at DESC, id DESC LIMIT ?1"
        ),
        vec![rusqlite::types::Value::Integer(limit as i64)],
      )
      .await
  }

  async fn dose_tail(&self, limit: usize) -> Result<Vec<DoseEvent>> {
    self
      .dose_query(
        format!("SELECT {DOSE_COLUMNS} FROM dose ORDER BY at DESC, id DESC LIMIT ?1"),
        vec![rusqlite::types::Value::Integer(limit as i64)],
      )
      .await
  }

  async fn device_snapshot(&self) -> Result<Option<DeviceSnapshot>> {
    let raw: Option<RawDevice> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DEVICE_COLUMNS} FROM device WHERE id = 0"),
              [],
              Self::device_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw.map(RawDevice::into_snapshot))
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_glucose(&self, sample: GlucoseSample) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO glucose (id, at, value, source_device, trend, difference)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            sample.id,
            sample.at.epoch_seconds(),
            sample.value,
            sample.source_device,
            sample.trend,
            sample.difference,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_dose(&self, event: DoseEvent) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO dose (id, at, kind, rate_or_amount, carbs, duration_minutes, label)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            event.id,
            event.at.epoch_seconds(),
            encode_dose_kind(event.kind),
            event.rate_or_amount,
            event.carbs,
            event.duration_minutes,
            event.label,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_device(&self, snapshot: DeviceSnapshot) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO device (id, {DEVICE_COLUMNS}) VALUES \
             (0, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
          rusqlite::params_from_iter(device_params(&snapshot)),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_device(&self, snapshot: DeviceSnapshot) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE device SET
             at = ?1, phone_battery = ?2, transmitter_battery = ?3,
             pump_battery = ?4, pump_cartridge_units = ?5,
             pump_reported_model = ?6, cannula_changed_at = ?7,
             sensor_changed_at = ?8, reservoir_changed_at = ?9,
             pump_name = ?10, phone_name = ?11, transmitter_name = ?12,
             insulin_name = ?13, sensor_name = ?14
           WHERE id = 0",
          rusqlite::params_from_iter(device_params(&snapshot)),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Read-back ─────────────────────────────────────────────────────────────

  async fn glucose_by_id(&self, id: i64) -> Result<Option<GlucoseSample>> {
    let rows = self
      .glucose_query(
        format!("SELECT {GLUCOSE_COLUMNS} FROM glucose WHERE id = ?1"),
        vec![rusqlite::types::Value::Integer(id)],
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn glucose_range(
    &self,
    start: CanonicalTime,
    end: CanonicalTime,
  ) -> Result<Vec<GlucoseSample>> {
    self
      .glucose_query(
        format!(
          "SELECT {GLUCOSE_COLUMNS} FROM glucose
           WHERE at BETWEEN ?1 AND ?2 ORDER BY at ASC, id ASC"
        ),
        vec![
          rusqlite::types::Value::Integer(start.epoch_seconds()),
          rusqlite::types::Value::Integer(end.epoch_seconds()),
        ],
      )
      .await
  }

  async fn dose_by_id(&self, id: i64) -> Result<Option<DoseEvent>> {
    let rows = self
      .dose_query(
        format!("SELECT {DOSE_COLUMNS} FROM dose WHERE id = ?1"),
        vec![rusqlite::types::Value::Integer(id)],
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn dose_range(
    &self,
    start: CanonicalTime,
    end: CanonicalTime,
  ) -> Result<Vec<DoseEvent>> {
    self
      .dose_query(
        format!(
          "SELECT {DOSE_COLUMNS} FROM dose
           WHERE at BETWEEN ?1 AND ?2 ORDER BY at ASC, id ASC"
        ),
        vec![
          rusqlite::types::Value::Integer(start.epoch_seconds()),
          rusqlite::types::Value::Integer(end.epoch_seconds()),
        ],
      )
      .await
  }
}

/// The snapshot's column values in `DEVICE_COLUMNS` order, as owned SQLite
/// values so one helper serves both the INSERT and the UPDATE.
fn device_params(snapshot: &DeviceSnapshot) -> Vec<rusqlite::types::Value> {
  use rusqlite::types::Value as Sql;

  fn opt_int(v: Option<i64>) -> Sql { v.map_or(Sql::Null, Sql::Integer) }
  fn opt_real(v: Option<f64>) -> Sql { v.map_or(Sql::Null, Sql::Real) }
  fn opt_time(v: Option<CanonicalTime>) -> Sql {
    v.map_or(Sql::Null, |t| Sql::Integer(t.epoch_seconds()))
  }
  fn opt_text(v: &Option<String>) -> Sql {
    v.clone().map_or(Sql::Null, Sql::Text)
  }

  vec![
    opt_time(snapshot.at),
    opt_int(snapshot.phone_battery),
    opt_int(snapshot.transmitter_battery),
    opt_int(snapshot.pump_battery),
    opt_real(snapshot.pump_cartridge_units),
    opt_text(&snapshot.pump_reported_model),
    opt_time(snapshot.cannula_changed_at),
    opt_time(snapshot.sensor_changed_at),
    opt_time(snapshot.reservoir_changed_at),
    Sql::Text(snapshot.names.pump_name.clone()),
    Sql::Text(snapshot.names.phone_name.clone()),
    Sql::Text(snapshot.names.transmitter_name.clone()),
    Sql::Text(snapshot.names.insulin_name.clone()),
    Sql::Text(snapshot.names.sensor_name.clone()),
  ]
}

// ─── CommandStore impl ───────────────────────────────────────────────────────

impl CommandStore for SqliteStore {
  type Error = Error;

  /// Execute an arbitrary parameterized statement — the trusted-caller
  /// escape hatch behind `PUT /put/command`. Statements that return no rows
  /// (INSERT, UPDATE) yield an empty result set.
  async fn raw_query(
    &self,
    query: String,
    params: Vec<serde_json::Value>,
  ) -> Result<Vec<Vec<serde_json::Value>>> {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&query)?;
        let column_count = stmt.column_count();
        let sql_params: Vec<rusqlite::types::Value> =
          params.into_iter().map(json_to_sql).collect();
        let rows = stmt
          .query_map(rusqlite::params_from_iter(sql_params), |row| {
            let mut out = Vec::with_capacity(column_count);
            for idx in 0..column_count {
              out.push(sql_to_json(row.get_ref(idx)?));
            }
            Ok(out)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}
