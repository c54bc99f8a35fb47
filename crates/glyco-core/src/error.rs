//! Error types for `glyco-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed upstream timestamp: {0:?}")]
  MalformedTimestamp(String),

  #[error("malformed record id: {0:?}")]
  MalformedId(String),

  #[error("id {0} does not fit the 12-digit grouped form")]
  SequenceExhausted(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
