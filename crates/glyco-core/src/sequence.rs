//! Sequential record identifiers.
//!
//! Ids are plain increasing integers. The legacy store format grouped them
//! as a zero-padded `xxxx:xxxx:xxxx` string; that form is kept here purely
//! as a display/parsing transform for compatibility, never as the working
//! representation.

use crate::{Error, Result};

/// Ids above this cannot be rendered in the 12-digit grouped form.
pub const GROUPED_ID_LIMIT: i64 = 1_000_000_000_000;

// ─── IdSequencer ─────────────────────────────────────────────────────────────

/// Mints strictly increasing ids, threading the cursor forward within a
/// reconciliation pass as well as across passes.
#[derive(Debug, Clone)]
pub struct IdSequencer {
  last: i64,
}

impl IdSequencer {
  /// Continue after the given last persisted id.
  pub fn from_last(last: i64) -> Self { Self { last } }

  /// Start a fresh stream; the first minted id is `floor` itself.
  pub fn from_floor(floor: i64) -> Self { Self { last: floor - 1 } }

  /// Continue after the cursor's last id, or bootstrap from `floor` when
  /// the table is empty.
  pub fn resume(last_id: Option<i64>, floor: i64) -> Self {
    match last_id {
      Some(id) => Self::from_last(id),
      None => Self::from_floor(floor),
    }
  }

  pub fn next(&mut self) -> i64 {
    self.last += 1;
    self.last
  }
}

// ─── Legacy grouped form ─────────────────────────────────────────────────────

/// Render an id in the legacy `xxxx:xxxx:xxxx` form.
pub fn format_grouped(id: i64) -> Result<String> {
  if !(0..GROUPED_ID_LIMIT).contains(&id) {
    return Err(Error::SequenceExhausted(id));
  }
  let digits = format!("{id:012}");
  Ok(format!("{}:{}:{}", &digits[0..4], &digits[4..8], &digits[8..12]))
}

/// Parse either the grouped form or a bare integer.
pub fn parse_grouped(s: &str) -> Result<i64> {
  s.replace(':', "")
    .parse()
    .map_err(|_| Error::MalformedId(s.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sequencer_resumes_after_last_id() {
    let mut seq = IdSequencer::resume(Some(41), 1);
    assert_eq!(seq.next(), 42);
    assert_eq!(seq.next(), 43);
  }

  #[test]
  fn sequencer_bootstraps_at_floor() {
    let mut seq = IdSequencer::resume(None, 1);
    assert_eq!(seq.next(), 1);
    assert_eq!(seq.next(), 2);
  }

  #[test]
  fn grouped_form_round_trips() {
    assert_eq!(format_grouped(0).unwrap(), "0000:0000:0000");
    assert_eq!(format_grouped(123_456).unwrap(), "0000:0012:3456");
    assert_eq!(parse_grouped("0000:0012:3456").unwrap(), 123_456);
    assert_eq!(parse_grouped("97").unwrap(), 97);
  }

  #[test]
  fn grouped_form_overflows_at_twelve_digits() {
    assert!(format_grouped(GROUPED_ID_LIMIT - 1).is_ok());
    assert!(matches!(
      format_grouped(GROUPED_ID_LIMIT),
      Err(Error::SequenceExhausted(_))
    ));
  }

  #[test]
  fn parse_rejects_non_numeric() {
    assert!(matches!(parse_grouped("00x0:0000:0001"), Err(Error::MalformedId(_))));
  }
}
