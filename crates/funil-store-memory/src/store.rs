//! [`MemoryStore`] — the in-memory implementation of [`DocumentStore`] and
//! [`SettingsStore`].

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicU32, Ordering},
  },
};

use chrono::Utc;
use funil_core::{
  Error, Result,
  settings::{Setting, SettingsStore},
  store::{
    Document, DocumentCollection, DocumentId, DocumentStore, Filter,
    FindOptions, UpdateDoc,
  },
};
use serde_json::Value;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An in-memory document store.
///
/// Cloning is cheap — clones share the same backing data, so a store cloned
/// into a repository and a test observe the same records. Data survives
/// `close()`/`connect()` cycles the way a remote backend's data would; only
/// the connection state resets.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
  connected:        AtomicBool,
  connect_attempts: AtomicU32,
  /// Serializes connection establishment so concurrent `connect()` callers
  /// share a single physical attempt.
  gate:             tokio::sync::Mutex<()>,
  data:             Mutex<Data>,
}

#[derive(Default)]
struct Data {
  collections: HashMap<String, Vec<Document>>,
  settings:    Vec<Setting>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Number of physical connection attempts made so far. Lets tests assert
  /// that concurrent `connect()` calls were collapsed into one attempt.
  pub fn connect_attempts(&self) -> u32 {
    self.inner.connect_attempts.load(Ordering::Acquire)
  }

  fn data(&self) -> MutexGuard<'_, Data> {
    self.inner.data.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl DocumentStore for MemoryStore {
  type Collection = MemoryCollection;

  async fn connect(&self) -> Result<()> {
    if self.inner.connected.load(Ordering::Acquire) {
      return Ok(());
    }
    let _guard = self.inner.gate.lock().await;
    // A concurrent caller may have finished connecting while we waited.
    if self.inner.connected.load(Ordering::Acquire) {
      return Ok(());
    }
    self.inner.connect_attempts.fetch_add(1, Ordering::AcqRel);
    // Simulated handshake: suspend once, like real connection I/O would.
    tokio::task::yield_now().await;
    self.inner.connected.store(true, Ordering::Release);
    Ok(())
  }

  async fn close(&self) -> Result<()> {
    self.inner.connected.store(false, Ordering::Release);
    Ok(())
  }

  fn is_connected(&self) -> bool {
    self.inner.connected.load(Ordering::Acquire)
  }

  fn collection(&self, name: &str) -> Result<MemoryCollection> {
    if !self.is_connected() {
      return Err(Error::NotConnected);
    }
    Ok(MemoryCollection {
      inner: Arc::clone(&self.inner),
      name:  name.to_owned(),
    })
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// Handle bound to one named collection of a [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryCollection {
  inner: Arc<Inner>,
  name:  String,
}

impl MemoryCollection {
  fn data(&self) -> Result<MutexGuard<'_, Data>> {
    // The store may have been closed after this handle was created.
    if !self.inner.connected.load(Ordering::Acquire) {
      return Err(Error::NotConnected);
    }
    Ok(self.inner.data.lock().unwrap_or_else(PoisonError::into_inner))
  }
}

impl DocumentCollection for MemoryCollection {
  async fn insert_one(&self, body: Value) -> Result<DocumentId> {
    let id = DocumentId::generate();
    self
      .data()?
      .collections
      .entry(self.name.clone())
      .or_default()
      .push(Document { id, body });
    Ok(id)
  }

  async fn find(
    &self,
    filter: &Filter,
    options: &FindOptions,
  ) -> Result<Vec<Document>> {
    let matched: Vec<Document> = {
      let data = self.data()?;
      data
        .collections
        .get(&self.name)
        .into_iter()
        .flatten()
        .filter(|doc| filter.matches(doc))
        .cloned()
        .collect()
    };
    Ok(options.apply(matched))
  }

  async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
    let data = self.data()?;
    Ok(
      data
        .collections
        .get(&self.name)
        .into_iter()
        .flatten()
        .find(|doc| filter.matches(doc))
        .cloned(),
    )
  }

  async fn update_one(
    &self,
    filter: &Filter,
    update: &UpdateDoc,
  ) -> Result<bool> {
    let mut data = self.data()?;
    let Some(doc) = data
      .collections
      .get_mut(&self.name)
      .into_iter()
      .flatten()
      .find(|doc| filter.matches(doc))
    else {
      return Ok(false);
    };
    update.apply(&mut doc.body);
    Ok(true)
  }

  async fn delete_one(&self, filter: &Filter) -> Result<bool> {
    let mut data = self.data()?;
    let Some(docs) = data.collections.get_mut(&self.name) else {
      return Ok(false);
    };
    match docs.iter().position(|doc| filter.matches(doc)) {
      Some(index) => {
        docs.remove(index);
        Ok(true)
      }
      None => Ok(false),
    }
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

impl SettingsStore for MemoryStore {
  async fn save(&self, chave: &str, valor: &str) -> Result<()> {
    self.connect().await?;
    let mut data = self.data();
    let now = Utc::now();
    // Upsert under the data lock; no check-then-act window.
    match data.settings.iter_mut().find(|s| s.chave == chave) {
      Some(setting) => {
        setting.valor = valor.to_owned();
        setting.atualizado_em = now;
      }
      None => data.settings.push(Setting {
        chave:         chave.to_owned(),
        valor:         valor.to_owned(),
        atualizado_em: now,
      }),
    }
    Ok(())
  }

  async fn load(&self, chave: &str) -> Result<Option<Setting>> {
    self.connect().await?;
    let data = self.data();
    Ok(
      data
        .settings
        .iter()
        .filter(|s| s.chave == chave)
        .max_by_key(|s| s.atualizado_em)
        .cloned(),
    )
  }
}
