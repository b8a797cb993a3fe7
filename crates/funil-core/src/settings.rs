//! Flat key-value settings with latest-wins read resolution.
//!
//! Keys observed in practice: `mapbox_token` (map-provider access token) and
//! `horarios_disponiveis` (comma-separated appointment slots). Absence of a
//! key is a valid state; callers supply their own defaults.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A persisted configuration entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
  pub chave:         String,
  pub valor:         String,
  #[serde(with = "chrono::serde::ts_microseconds")]
  pub atualizado_em: DateTime<Utc>,
}

/// Abstraction over the relational settings backend.
///
/// `save` must be atomic per key (upsert, not check-then-act), so concurrent
/// writers for the same key cannot produce duplicate rows. `load` resolves
/// latest-wins by `atualizado_em` at read time, which also tolerates
/// duplicate rows left behind by storage predating the uniqueness
/// constraint.
pub trait SettingsStore: Send + Sync {
  fn save<'a>(
    &'a self,
    chave: &'a str,
    valor: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  fn load<'a>(
    &'a self,
    chave: &'a str,
  ) -> impl Future<Output = Result<Option<Setting>>> + Send + 'a;
}
