//! Error type for `glyco-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("unknown dose kind in store: {0:?}")]
  UnknownDoseKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
