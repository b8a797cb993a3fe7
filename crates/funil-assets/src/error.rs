//! Error type for `funil-assets`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An operation ran before `connect()` succeeded.
  #[error("asset vault is not connected")]
  NotConnected,

  #[error("registry I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("registry serialization error: {0}")]
  Json(#[from] serde_json::Error),

  /// Stored content that is no longer valid base64.
  #[error("corrupt stored content for asset {0}")]
  CorruptContent(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
