//! Error types for `funil-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// `connect()` was called on a store with no connection target
  /// configured.
  #[error("connection target is not configured")]
  MissingConnectionTarget,

  /// An operation that needs a live connection ran before `connect()`
  /// succeeded (or after `close()`).
  #[error("document store is not connected")]
  NotConnected,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Opaque backend failure, passed through unchanged.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap an upstream backend error without reinterpreting it.
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
