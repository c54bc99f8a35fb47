//! Per-stream and per-cycle result tallies.

use std::fmt;

/// What happened to one stream's batch in one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
  /// Records accepted as new and committed.
  pub admitted: usize,
  /// Records dropped: unclassifiable, stale against the cursor, or
  /// duplicate candidates.
  pub skipped:  usize,
  /// Records whose commit failed; the rest of the batch was abandoned.
  pub failed:   usize,
}

/// A stream's pass outcome. `ok == false` means the stream was aborted
/// before any record was processed (cursor load failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamResult {
  pub ok:     bool,
  pub report: StreamReport,
}

/// The result of one full fetch-reconcile-commit cycle. A `None` slot means
/// the stream is disabled by configuration, not that it failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOutcome {
  pub glucose: Option<StreamResult>,
  pub dose:    Option<StreamResult>,
  pub device:  Option<StreamResult>,
}

impl fmt::Display for CycleOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_stream(f, "glucose", self.glucose)?;
    write!(f, " | ")?;
    fmt_stream(f, "dose", self.dose)?;
    write!(f, " | ")?;
    fmt_stream(f, "device", self.device)
  }
}

fn fmt_stream(
  f: &mut fmt::Formatter<'_>,
  name: &str,
  result: Option<StreamResult>,
) -> fmt::Result {
  match result {
    None => write!(f, "{name} off"),
    Some(StreamResult { ok: false, .. }) => write!(f, "{name} aborted"),
    Some(StreamResult { report, .. }) => write!(
      f,
      "{name} admitted={} skipped={} failed={}",
      report.admitted, report.skipped, report.failed
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outcome_summary_line() {
    let outcome = CycleOutcome {
      glucose: Some(StreamResult {
        ok:     true,
        report: StreamReport { admitted: 3, skipped: 97, failed: 0 },
      }),
      dose:    None,
      device:  Some(StreamResult { ok: false, report: StreamReport::default() }),
    };
    assert_eq!(
      outcome.to_string(),
      "glucose admitted=3 skipped=97 failed=0 | dose off | device aborted"
    );
  }
}
