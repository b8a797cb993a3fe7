//! Handlers for `/leads` endpoints.
//!
//! | Method   | Path                   | Notes |
//! |----------|------------------------|-------|
//! | `GET`    | `/leads`               | Optional `?status=`, `?corretor_id=`, `?origem=` (AND-combined) |
//! | `POST`   | `/leads`               | Body: partial lead |
//! | `GET`    | `/leads/{id}`          | 404 if not found |
//! | `PATCH`  | `/leads/{id}`          | Partial update; any `id` in the body is ignored |
//! | `DELETE` | `/leads/{id}`          | 404 if not found |
//! | `POST`   | `/leads/{id}/contato`  | Body: `{"observacoes": "..."}` |
//! | `POST`   | `/leads/{id}/corretor` | Body: `{"corretor_id": "..."}`; forces status `contatado` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use funil_core::{
  lead::{Lead, LeadFilter, LeadUpdate, NewLead},
  settings::SettingsStore,
  store::DocumentStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `GET /leads[?status=…&corretor_id=…&origem=…]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(filter): Query<LeadFilter>,
) -> Result<Json<Vec<Lead>>, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  Ok(Json(state.leads.get_leads(&filter).await?))
}

/// `POST /leads`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(input): Json<NewLead>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  let lead = state.leads.add_lead(input).await?;
  Ok((StatusCode::CREATED, Json(lead)))
}

/// `GET /leads/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  state
    .leads
    .get_lead(&id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("lead {id}")))
}

/// `PATCH /leads/{id}` — returns the lead after the update.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(patch): Json<LeadUpdate>,
) -> Result<Json<Lead>, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  if !state.leads.update_lead(&id, patch).await? {
    return Err(ApiError::NotFound(format!("lead {id}")));
  }
  state
    .leads
    .get_lead(&id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("lead {id}")))
}

/// `DELETE /leads/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  if state.leads.delete_lead(&id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("lead {id}")))
  }
}

#[derive(Debug, Deserialize)]
pub struct ContatoBody {
  pub observacoes: String,
}

/// `POST /leads/{id}/contato` — stamps `ultimo_contato` and overwrites the
/// notes.
pub async fn registrar_contato<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<ContatoBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  if state.leads.registrar_contato(&id, &body.observacoes).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("lead {id}")))
  }
}

#[derive(Debug, Deserialize)]
pub struct CorretorBody {
  pub corretor_id: String,
}

/// `POST /leads/{id}/corretor`
pub async fn atribuir_corretor<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<CorretorBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  if state.leads.atribuir_corretor(&id, &body.corretor_id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("lead {id}")))
  }
}
