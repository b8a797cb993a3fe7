//! Handlers for `/assets` — uploads, metadata, content download.
//!
//! Uploads arrive as JSON with base64 content, the shape the web client
//! already produces. The maximum-size policy lives here, at the caller side
//! of the vault boundary.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use funil_assets::{AssetRecord, FileUpload};
use funil_core::{settings::SettingsStore, store::DocumentStore};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub pasta: Option<String>,
}

/// `GET /assets[?pasta=…]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AssetRecord>>, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  Ok(Json(state.assets.list(params.pasta.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct UploadBody {
  pub nome:            String,
  pub mime_type:       String,
  /// Standard base64 (RFC 4648) of the file content.
  pub conteudo_base64: String,
  pub pasta:           Option<String>,
}

/// `POST /assets`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  let conteudo = BASE64
    .decode(&body.conteudo_base64)
    .map_err(|_| ApiError::BadRequest("conteudo_base64 is not valid base64".into()))?;
  if conteudo.len() > state.max_upload_bytes {
    return Err(ApiError::PayloadTooLarge(format!(
      "{} bytes exceeds the {} byte limit",
      conteudo.len(),
      state.max_upload_bytes
    )));
  }

  let record = state
    .assets
    .upload(
      FileUpload {
        nome:      body.nome,
        mime_type: body.mime_type,
        conteudo:  conteudo.into(),
      },
      body.pasta.as_deref(),
    )
    .await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /assets/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<AssetRecord>, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  state
    .assets
    .get(&id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("asset {id}")))
}

/// `GET /assets/{id}/conteudo` — raw bytes with the stored MIME type.
pub async fn download<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  let (record, bytes) = state
    .assets
    .content(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("asset {id}")))?;
  Ok(([(header::CONTENT_TYPE, record.mime_type)], bytes))
}

/// `GET /assets/{id}/thumbnail` — preview bytes for image assets.
///
/// The vault stores no scaled rendition, so the original content is served.
/// Assets that never advertised a thumbnail (non-images) 404 here.
pub async fn thumbnail<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  let (record, bytes) = state
    .assets
    .content(&id)
    .await?
    .filter(|(record, _)| record.thumbnail_url.is_some())
    .ok_or_else(|| ApiError::NotFound(format!("thumbnail for asset {id}")))?;
  Ok(([(header::CONTENT_TYPE, record.mime_type)], bytes))
}

/// `DELETE /assets/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + SettingsStore + Clone,
{
  if state.assets.delete(&id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("asset {id}")))
  }
}
