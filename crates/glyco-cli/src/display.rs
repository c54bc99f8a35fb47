//! Console status block for the latest glucose/dose/device rows.
//!
//! The "last printed id" is explicit state owned by the caller and threaded
//! through every call: when the newest glucose row is the one already shown,
//! nothing is printed.

use glyco_core::{
  record::{DeviceSnapshot, DoseEvent, GlucoseSample},
  store::TelemetryStore,
};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
  /// Print the status block after each looping cycle.
  pub enabled: bool,
}

impl Default for DisplayConfig {
  fn default() -> Self { Self { enabled: true } }
}

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Icon for an upstream trend code.
pub fn trend_icon(code: &str) -> &'static str {
  match code {
    "Flat" => "➡️",
    "FortyFiveUp" => "↗️",
    "SingleUp" => "⬆️",
    "DoubleUp" => "⬆️⬆️",
    "FortyFiveDown" => "↘️",
    "SingleDown" => "⬇️",
    "DoubleDown" => "⬇️⬇️",
    _ => "❔",
  }
}

/// Icon for a glucose level in mmol/L.
pub fn level_icon(mmol: f64) -> &'static str {
  if mmol < 4.0 {
    "🔴"
  } else if mmol < 5.0 {
    "🟡"
  } else if mmol <= 7.4 {
    "🟢"
  } else if mmol <= 10.0 {
    "🟡"
  } else {
    "🔴"
  }
}

/// Icon for a battery (or cartridge-fill) percentage.
pub fn battery_icon(pct: i64) -> &'static str {
  if pct > 30 {
    "🟩"
  } else if pct >= 20 {
    "🟨"
  } else {
    "🟥"
  }
}

// ─── Status block ─────────────────────────────────────────────────────────────

/// Print the latest rows; skipped entirely when the newest glucose id
/// matches `last_printed`.
pub async fn print_status<S>(
  store: &S,
  last_printed: &mut Option<i64>,
) -> anyhow::Result<()>
where
  S: TelemetryStore,
{
  let glucose = store.glucose_tail(1).await?;
  let Some(current) = glucose.into_iter().next() else {
    println!("no glucose rows yet");
    return Ok(());
  };
  if *last_printed == Some(current.id) {
    return Ok(());
  }

  let dose = store.dose_tail(1).await?.into_iter().next();
  let device = store.device_snapshot().await?;

  println!("{}", glucose_line(&current));
  if let Some(event) = dose {
    println!("{}", dose_line(&event));
  }
  if let Some(snapshot) = device {
    println!("{}", device_line(&snapshot));
  }

  *last_printed = Some(current.id);
  Ok(())
}

fn glucose_line(sample: &GlucoseSample) -> String {
  format!(
    "{}  id {}  {} {}  {} {}  {}",
    sample.at,
    sample.id,
    level_icon(sample.value),
    sample.value,
    trend_icon(&sample.trend),
    sample.trend,
    sample.difference,
  )
}

fn dose_line(event: &DoseEvent) -> String {
  let amount = event
    .rate_or_amount
    .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
  let carbs = event
    .carbs
    .map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
  format!(
    "{}  {}  amount {}  carbs {}  {}min",
    event.at, event.label, amount, carbs, event.duration_minutes,
  )
}

fn device_line(snapshot: &DeviceSnapshot) -> String {
  let mut parts = Vec::new();
  if let Some(pct) = snapshot.phone_battery {
    parts.push(format!("{} {} {pct}%", snapshot.names.phone_name, battery_icon(pct)));
  }
  if let Some(pct) = snapshot.transmitter_battery {
    parts.push(format!(
      "{} {} {pct}%",
      snapshot.names.transmitter_name,
      battery_icon(pct)
    ));
  }
  if let Some(pct) = snapshot.pump_battery {
    parts.push(format!("{} {} {pct}%", snapshot.names.pump_name, battery_icon(pct)));
  }
  if let Some(units) = snapshot.pump_cartridge_units {
    parts.push(format!("🍶 {units}U"));
  }
  parts.join(" | ")
}
