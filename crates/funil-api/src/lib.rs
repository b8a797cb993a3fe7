//! JSON REST API for Funil.
//!
//! Exposes an axum [`Router`] backed by any document + settings store and an
//! [`AssetVault`]. Auth, TLS, and transport concerns are the caller's
//! responsibility; the composition root lives in the `server` binary.

pub mod assets;
pub mod config;
pub mod error;
pub mod leads;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use funil_assets::AssetVault;
use funil_core::{
  repo::LeadRepository, settings::SettingsStore, store::DocumentStore,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Default maximum accepted upload size (10 MiB), matching the limit the web
/// client enforces on its side.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. All services are
/// injected; the handlers never construct or globally resolve one.
pub struct AppState<S> {
  pub leads:            Arc<LeadRepository<S>>,
  pub settings:         Arc<S>,
  pub assets:           AssetVault,
  pub max_upload_bytes: usize,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      leads:            Arc::clone(&self.leads),
      settings:         Arc::clone(&self.settings),
      assets:           self.assets.clone(),
      max_upload_bytes: self.max_upload_bytes,
    }
  }
}

impl<S> AppState<S>
where
  S: DocumentStore + SettingsStore + Clone,
{
  /// One backing store serves both documents and settings; the repository
  /// and the settings handle share it.
  pub fn new(store: S, assets: AssetVault, max_upload_bytes: usize) -> Self {
    Self {
      settings: Arc::new(store.clone()),
      leads: Arc::new(LeadRepository::new(store)),
      assets,
      max_upload_bytes,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocumentStore + SettingsStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Leads
    .route("/leads", get(leads::list::<S>).post(leads::create::<S>))
    .route(
      "/leads/{id}",
      get(leads::get_one::<S>)
        .patch(leads::update::<S>)
        .delete(leads::remove::<S>),
    )
    .route("/leads/{id}/contato", post(leads::registrar_contato::<S>))
    .route("/leads/{id}/corretor", post(leads::atribuir_corretor::<S>))
    // Settings
    .route(
      "/config/{chave}",
      get(config::get_one::<S>).put(config::put_one::<S>),
    )
    // Assets
    .route("/assets", get(assets::list::<S>).post(assets::upload::<S>))
    .route(
      "/assets/{id}",
      get(assets::get_one::<S>).delete(assets::remove::<S>),
    )
    .route("/assets/{id}/conteudo", get(assets::download::<S>))
    .route("/assets/{id}/thumbnail", get(assets::thumbnail::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
