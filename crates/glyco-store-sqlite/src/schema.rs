//! SQL schema for the glyco SQLite store.
//!
//! Applied once at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Glucose rows are strictly append-only; ids are engine-assigned and
-- strictly increasing with `at` within the stream.
CREATE TABLE IF NOT EXISTS glucose (
    id            INTEGER PRIMARY KEY,
    at            INTEGER NOT NULL,    -- epoch seconds, minute precision
    value         REAL    NOT NULL,    -- mg/dL or mmol/L per deployment
    source_device TEXT    NOT NULL DEFAULT '',
    trend         TEXT    NOT NULL DEFAULT '',
    difference    TEXT    NOT NULL DEFAULT '0.0'
);

-- Insulin/carb events, append-only.
CREATE TABLE IF NOT EXISTS dose (
    id               INTEGER PRIMARY KEY,
    at               INTEGER NOT NULL,
    kind             TEXT    NOT NULL,  -- 'basal_rate' | 'bolus_injection' | 'carb_correction'
    rate_or_amount   REAL,
    carbs            REAL,
    duration_minutes INTEGER NOT NULL DEFAULT 0,
    label            TEXT    NOT NULL
);

-- The device table holds at most one row, updated in place.
CREATE TABLE IF NOT EXISTS device (
    id                   INTEGER PRIMARY KEY CHECK (id = 0),
    at                   INTEGER,
    phone_battery        INTEGER,
    transmitter_battery  INTEGER,
    pump_battery         INTEGER,
    pump_cartridge_units REAL,
    pump_reported_model  TEXT,
    cannula_changed_at   INTEGER,
    sensor_changed_at    INTEGER,
    reservoir_changed_at INTEGER,
    pump_name            TEXT NOT NULL DEFAULT '',
    phone_name           TEXT NOT NULL DEFAULT '',
    transmitter_name     TEXT NOT NULL DEFAULT '',
    insulin_name         TEXT NOT NULL DEFAULT '',
    sensor_name          TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS glucose_at_idx ON glucose(at);
CREATE INDEX IF NOT EXISTS dose_at_idx    ON dose(at);

PRAGMA user_version = 1;
";
