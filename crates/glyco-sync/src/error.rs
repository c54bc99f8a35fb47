//! Error type for `glyco-sync`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The store could not be reached while loading a stream's cursor. The
  /// driver aborts that stream for the cycle and continues with siblings.
  #[error("store unavailable: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
