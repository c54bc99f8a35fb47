//! Device-stream reduction: many status pings in, one snapshot delta out.

use glyco_core::record::PartialDeviceFields;

// ─── Uploader attribution ────────────────────────────────────────────────────

/// Which physical device an uploader battery reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderOwner {
  Phone,
  Transmitter,
}

/// Attribute an uploader battery reading to the phone or the transmitter.
///
/// The upstream shape carries no explicit owner; this is inferred from which
/// keys the ping happens to have. Known-fragile, so it lives in exactly one
/// place and nothing else encodes the rule:
///
/// - `name` equal to the configured transmitter tag → transmitter;
/// - otherwise a `timestamp` key present → phone;
/// - otherwise → phone, as the fallback.
pub fn attribute_uploader(
  name: Option<&str>,
  has_timestamp: bool,
  transmitter_tag: &str,
) -> UploaderOwner {
  match (name, has_timestamp) {
    (Some(n), _) if n == transmitter_tag => UploaderOwner::Transmitter,
    (_, true) => UploaderOwner::Phone,
    _ => UploaderOwner::Phone,
  }
}

// ─── Reduction ───────────────────────────────────────────────────────────────

/// Fold an ordered sequence of ping field-sets into one delta.
///
/// Pings are walked in upstream-delivered order (newest-first) and each
/// tracked field group is filled from the FIRST ping that supplies it, then
/// locked against later overwrites — first-write-wins per field, independent
/// across fields. The cartridge reading, its timestamp, and the reported
/// model move as one group.
pub fn reduce_pings(pings: &[PartialDeviceFields]) -> PartialDeviceFields {
  let mut merged = PartialDeviceFields::default();
  for ping in pings {
    if merged.pump_battery.is_none() {
      merged.pump_battery = ping.pump_battery;
    }
    if merged.pump_cartridge_units.is_none() && ping.pump_cartridge_units.is_some() {
      merged.pump_cartridge_units = ping.pump_cartridge_units;
      merged.pump_reported_model = ping.pump_reported_model.clone();
      merged.at = ping.at;
    }
    if merged.transmitter_battery.is_none() {
      merged.transmitter_battery = ping.transmitter_battery;
    }
    if merged.phone_battery.is_none() {
      merged.phone_battery = ping.phone_battery;
    }
  }
  merged
}
