//! Error type for `glyco-client`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("api returned {status} for {path}")]
  Api { status: u16, path: String },

  #[error("cannot decode api response: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
