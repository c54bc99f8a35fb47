//! Canonical time — the single internal representation used for every
//! ordering comparison.
//!
//! Upstream delivers wall-clock strings like `2024-01-15T08:30:12.345Z`.
//! [`TimeNormalizer`] parses that shape, applies the deployment's fixed
//! offset, and truncates to the minute. The result is stored and serialized
//! as epoch seconds; the legacy `YYYY-MM-DD-HH-MM` string survives only as a
//! display and query format.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// The timestamp shape the upstream API delivers.
const UPSTREAM_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Minute-resolution display/query form, e.g. `2024-01-15-08-30`.
const COMPACT_FORMAT: &str = "%Y-%m-%d-%H-%M";

// ─── CanonicalTime ───────────────────────────────────────────────────────────

/// A minute-precision UTC instant.
///
/// Internally an epoch-seconds count floored to the minute, so ordering is
/// plain integer ordering and the stored form is stable across backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalTime(i64);

impl CanonicalTime {
  /// Build from an epoch-seconds count; sub-minute precision is dropped.
  pub fn from_epoch_seconds(secs: i64) -> Self {
    Self(secs - secs.rem_euclid(60))
  }

  pub fn epoch_seconds(&self) -> i64 { self.0 }

  /// Parse the minute-resolution `YYYY-MM-DD-HH-MM` form.
  pub fn parse_compact(s: &str) -> Result<Self> {
    let naive = NaiveDateTime::parse_from_str(s, COMPACT_FORMAT)
      .map_err(|_| Error::MalformedTimestamp(s.to_string()))?;
    Ok(Self::from_epoch_seconds(naive.and_utc().timestamp()))
  }
}

impl std::fmt::Display for CanonicalTime {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match DateTime::<Utc>::from_timestamp(self.0, 0) {
      Some(dt) => write!(f, "{}", dt.format(COMPACT_FORMAT)),
      None => write!(f, "{}", self.0),
    }
  }
}

impl Serialize for CanonicalTime {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(self.0)
  }
}

impl<'de> Deserialize<'de> for CanonicalTime {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let secs = i64::deserialize(deserializer)?;
    Ok(Self::from_epoch_seconds(secs))
  }
}

// ─── TimeNormalizer ──────────────────────────────────────────────────────────

/// Converts upstream timestamp strings into [`CanonicalTime`].
///
/// The offset is a deployment constant (the upstream reports a fixed-offset
/// wall clock), not a per-record property.
#[derive(Debug, Clone)]
pub struct TimeNormalizer {
  offset: Duration,
}

impl TimeNormalizer {
  pub fn new(offset_hours: i32) -> Self {
    Self { offset: Duration::hours(i64::from(offset_hours)) }
  }

  /// Fails with [`Error::MalformedTimestamp`]; the caller drops that single
  /// record rather than aborting the batch.
  pub fn normalize(&self, raw: &str) -> Result<CanonicalTime> {
    let naive = NaiveDateTime::parse_from_str(raw, UPSTREAM_FORMAT)
      .map_err(|_| Error::MalformedTimestamp(raw.to_string()))?;
    let shifted = naive.and_utc() + self.offset;
    Ok(CanonicalTime::from_epoch_seconds(shifted.timestamp()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_applies_offset_and_floors_to_minute() {
    let norm = TimeNormalizer::new(3);
    let t = norm.normalize("2024-01-15T08:30:12.345Z").unwrap();
    assert_eq!(t.to_string(), "2024-01-15-11-30");
    assert_eq!(t.epoch_seconds() % 60, 0);
  }

  #[test]
  fn normalize_accepts_whole_second_timestamps() {
    let norm = TimeNormalizer::new(0);
    let t = norm.normalize("2024-01-15T08:30:12Z").unwrap();
    assert_eq!(t.to_string(), "2024-01-15-08-30");
  }

  #[test]
  fn normalize_rejects_garbage() {
    let norm = TimeNormalizer::new(3);
    assert!(matches!(
      norm.normalize("yesterday-ish"),
      Err(Error::MalformedTimestamp(_))
    ));
  }

  #[test]
  fn compact_form_round_trips() {
    let t = CanonicalTime::parse_compact("2024-01-15-11-30").unwrap();
    assert_eq!(t.to_string(), "2024-01-15-11-30");
  }

  #[test]
  fn ordering_follows_epoch_order() {
    let a = CanonicalTime::parse_compact("2024-01-15-11-30").unwrap();
    let b = CanonicalTime::parse_compact("2024-01-15-11-31").unwrap();
    assert!(b > a);
    assert!(b >= a);
    assert_eq!(a, CanonicalTime::from_epoch_seconds(a.epoch_seconds() + 59));
  }
}
