//! Error type for `glyco-nightscout`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Transport-level failure (connect, timeout, body decode). The sync
  /// driver treats this as "no data this cycle" for the affected stream.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
