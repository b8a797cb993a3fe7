//! [`AssetVault`] — the uploaded-asset registry.

use std::{
  path::PathBuf,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct VaultConfig {
  /// Where the registry JSON lives. `None` keeps the registry purely in
  /// memory (tests, throwaway environments).
  pub registry_path: Option<PathBuf>,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Metadata for one uploaded asset, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
  pub id:            String,
  pub nome:          String,
  pub mime_type:     String,
  pub tamanho:       u64,
  /// Download URL, served by the API layer.
  pub url:           String,
  /// Present only for `image/*` assets.
  pub thumbnail_url: Option<String>,
  pub pasta:         Option<String>,
  pub criado_em:     DateTime<Utc>,
  pub modificado_em: DateTime<Utc>,
}

/// Registry entry: metadata plus the base64-encoded content. The content
/// never leaves the vault except through [`AssetVault::content`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAsset {
  #[serde(flatten)]
  meta:     AssetRecord,
  conteudo: String,
}

/// A raw file-like input: name, MIME type and full binary content. Size
/// limits are the caller's policy, enforced before the upload reaches the
/// vault.
#[derive(Debug, Clone)]
pub struct FileUpload {
  pub nome:      String,
  pub mime_type: String,
  pub conteudo:  Bytes,
}

// ─── Vault ───────────────────────────────────────────────────────────────────

/// Drive-like asset store with its own connection lifecycle, independent of
/// the document store. Cloning is cheap — clones share the registry.
#[derive(Clone)]
pub struct AssetVault {
  inner: Arc<Inner>,
}

struct Inner {
  config:    VaultConfig,
  connected: AtomicBool,
  /// Serializes connection establishment, same guard as the document store.
  gate:      tokio::sync::Mutex<()>,
  registry:  tokio::sync::Mutex<Vec<StoredAsset>>,
}

impl AssetVault {
  pub fn new(config: VaultConfig) -> Self {
    Self {
      inner: Arc::new(Inner {
        config,
        connected: AtomicBool::new(false),
        gate: tokio::sync::Mutex::new(()),
        registry: tokio::sync::Mutex::new(Vec::new()),
      }),
    }
  }

  /// A vault whose registry lives only in memory.
  pub fn in_memory() -> Self { Self::new(VaultConfig::default()) }

  /// Load the persisted registry and mark the vault connected. Idempotent;
  /// concurrent callers share one attempt.
  pub async fn connect(&self) -> Result<()> {
    if self.is_connected() {
      return Ok(());
    }
    let _guard = self.inner.gate.lock().await;
    if self.is_connected() {
      return Ok(());
    }

    if let Some(path) = &self.inner.config.registry_path {
      let loaded: Vec<StoredAsset> = match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)?,
        // A missing registry file is a fresh vault.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(Error::Io(e)),
      };
      tracing::debug!(assets = loaded.len(), "asset registry loaded");
      *self.inner.registry.lock().await = loaded;
    }

    self.inner.connected.store(true, Ordering::Release);
    Ok(())
  }

  /// Pure state query, no side effects.
  pub fn is_connected(&self) -> bool {
    self.inner.connected.load(Ordering::Acquire)
  }

  fn ensure_connected(&self) -> Result<()> {
    if self.is_connected() { Ok(()) } else { Err(Error::NotConnected) }
  }

  /// Write the registry back to disk, if a path is configured. Called with
  /// the registry lock held so persisted snapshots never interleave.
  async fn persist(&self, registry: &[StoredAsset]) -> Result<()> {
    if let Some(path) = &self.inner.config.registry_path {
      let bytes = serde_json::to_vec_pretty(registry)?;
      tokio::fs::write(path, bytes).await?;
    }
    Ok(())
  }

  /// Store a new asset: content is base64-encoded next to its metadata and
  /// appended as-is — no de-duplication by name or content.
  pub async fn upload(
    &self,
    file: FileUpload,
    pasta: Option<&str>,
  ) -> Result<AssetRecord> {
    self.ensure_connected()?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let is_image = file.mime_type.starts_with("image/");
    let meta = AssetRecord {
      url: format!("/assets/{id}/conteudo"),
      thumbnail_url: is_image.then(|| format!("/assets/{id}/thumbnail")),
      id,
      nome: file.nome,
      mime_type: file.mime_type,
      tamanho: file.conteudo.len() as u64,
      pasta: pasta.map(str::to_owned),
      criado_em: now,
      modificado_em: now,
    };

    let mut registry = self.inner.registry.lock().await;
    registry.push(StoredAsset {
      meta: meta.clone(),
      conteudo: BASE64.encode(&file.conteudo),
    });
    // A mutation sticks only once persisted; on a failed write the in-memory
    // registry must keep matching disk.
    if let Err(e) = self.persist(&registry).await {
      registry.pop();
      return Err(e);
    }

    tracing::info!(id = %meta.id, nome = %meta.nome, tamanho = meta.tamanho, "asset uploaded");
    Ok(meta)
  }

  /// Metadata lookup by id.
  pub async fn get(&self, id: &str) -> Result<Option<AssetRecord>> {
    self.ensure_connected()?;
    let registry = self.inner.registry.lock().await;
    Ok(registry.iter().find(|a| a.meta.id == id).map(|a| a.meta.clone()))
  }

  /// Decoded content plus metadata, for serving downloads.
  pub async fn content(
    &self,
    id: &str,
  ) -> Result<Option<(AssetRecord, Bytes)>> {
    self.ensure_connected()?;
    let registry = self.inner.registry.lock().await;
    let Some(asset) = registry.iter().find(|a| a.meta.id == id) else {
      return Ok(None);
    };
    let bytes = BASE64
      .decode(&asset.conteudo)
      .map_err(|_| Error::CorruptContent(id.to_owned()))?;
    Ok(Some((asset.meta.clone(), Bytes::from(bytes))))
  }

  /// List assets, scoped to a folder when one is given. `None` lists
  /// everything.
  pub async fn list(&self, pasta: Option<&str>) -> Result<Vec<AssetRecord>> {
    self.ensure_connected()?;
    let registry = self.inner.registry.lock().await;
    Ok(
      registry
        .iter()
        .filter(|a| match pasta {
          Some(p) => a.meta.pasta.as_deref() == Some(p),
          None => true,
        })
        .map(|a| a.meta.clone())
        .collect(),
    )
  }

  /// Remove an asset. Returns whether a record actually existed — true
  /// exactly once per id.
  pub async fn delete(&self, id: &str) -> Result<bool> {
    self.ensure_connected()?;
    let mut registry = self.inner.registry.lock().await;
    let Some(index) = registry.iter().position(|a| a.meta.id == id) else {
      return Ok(false);
    };
    let removed = registry.remove(index);
    if let Err(e) = self.persist(&registry).await {
      registry.insert(index, removed);
      return Err(e);
    }
    tracing::info!(id, "asset deleted");
    Ok(true)
  }
}
