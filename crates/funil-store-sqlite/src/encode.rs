//! Encoding and decoding helpers between Rust types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings at fixed microsecond
//! precision, so their lexical order equals their chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use funil_core::{Error, Result};
use thiserror::Error as ThisError;

/// A row that could not be decoded back into its domain representation.
#[derive(Debug, ThisError)]
#[error("corrupt row: {0}")]
pub struct CorruptRow(pub String);

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::storage(CorruptRow(format!("bad timestamp {s:?}: {e}"))))
}
