//! Handlers for `/config/{chave}` — flat key-value settings.
//!
//! Known keys: `mapbox_token`, `horarios_disponiveis`. Absence of a key is a
//! valid state; the UI supplies its own default.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use funil_core::{
  settings::{Setting, SettingsStore},
  store::DocumentStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `GET /config/{chave}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(chave): Path<String>,
) -> Result<Json<Setting>, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  state
    .settings
    .load(&chave)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("config {chave}")))
}

#[derive(Debug, Deserialize)]
pub struct PutBody {
  pub valor: String,
}

/// `PUT /config/{chave}` — body: `{"valor": "..."}`
pub async fn put_one<S>(
  State(state): State<AppState<S>>,
  Path(chave): Path<String>,
  Json(body): Json<PutBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  state.settings.save(&chave, &body.valor).await?;
  Ok(StatusCode::NO_CONTENT)
}
