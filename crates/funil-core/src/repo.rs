//! [`LeadRepository`] — domain operations over any [`DocumentStore`].
//!
//! The repository is the single translation boundary between the stored
//! document shape and the domain [`Lead`]: storage-native identities never
//! leak to callers, and the opaque string id never enters a document body.
//!
//! Every operation lazily ensures the store is connected (idempotent
//! `connect()`), performs exactly one single-document operation, and on
//! failure logs and rethrows unchanged — no retries, no partial rollback.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
  Error, Result,
  lead::{Lead, LeadFilter, LeadStatus, LeadUpdate, NewLead},
  store::{
    DocumentCollection, DocumentId, DocumentStore, Filter, FindOptions, Sort,
    UpdateDoc,
  },
};

/// Collection holding lead documents.
const LEADS_COLLECTION: &str = "leads";

/// Lead CRUD and funnel operations, generic over the storage backend.
///
/// Mutation operations return `bool`: whether a lead with the given id
/// actually existed. A missing target is a signaled outcome, not an error —
/// callers may inspect the flag or ignore it.
#[derive(Debug, Clone)]
pub struct LeadRepository<S> {
  store: S,
}

impl<S: DocumentStore> LeadRepository<S> {
  /// The store is injected by the composition root; the repository never
  /// constructs or globally resolves one.
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Connect if needed and return the leads collection handle.
  async fn leads(&self) -> Result<S::Collection> {
    self
      .store
      .connect()
      .await
      .inspect_err(|e| tracing::error!(error = %e, "document store connect failed"))?;
    self.store.collection(LEADS_COLLECTION)
  }

  /// Insert a new lead. Unset required strings become empty, status defaults
  /// to `novo`, and `criado_em`/`atualizado_em` are stamped with the same
  /// instant.
  pub async fn add_lead(&self, input: NewLead) -> Result<Lead> {
    let now = now_micros();
    let lead = Lead {
      id:              String::new(),
      nome:            input.nome.unwrap_or_default(),
      email:           input.email.unwrap_or_default(),
      telefone:        input.telefone.unwrap_or_default(),
      origem:          input.origem.unwrap_or_default(),
      interesse:       input.interesse.unwrap_or_default(),
      observacoes:     input.observacoes,
      status:          input.status.unwrap_or_default(),
      corretor_id:     input.corretor_id,
      empreendimentos: input.empreendimentos,
      criado_em:       now,
      atualizado_em:   now,
      ultimo_contato:  None,
      proximo_contato: input.proximo_contato,
    };

    let coll = self.leads().await?;
    let id = coll
      .insert_one(to_body(&lead)?)
      .await
      .inspect_err(|e| tracing::error!(error = %e, "add_lead failed"))?;

    Ok(Lead { id: id.to_string(), ..lead })
  }

  /// Fetch a single lead by its opaque id.
  pub async fn get_lead(&self, id: &str) -> Result<Option<Lead>> {
    let Some(doc_id) = DocumentId::parse(id) else {
      return Ok(None);
    };
    let coll = self.leads().await?;
    let doc = coll
      .find_one(&Filter::by_id(doc_id))
      .await
      .inspect_err(|e| tracing::error!(lead_id = id, error = %e, "get_lead failed"))?;
    doc.map(from_document).transpose()
  }

  /// List leads matching `filter`, newest first (by `criado_em`).
  pub async fn get_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
    let mut query = Filter::new();
    if let Some(status) = filter.status {
      query = query.field("status", status.as_str());
    }
    if let Some(corretor_id) = &filter.corretor_id {
      query = query.field("corretor_id", corretor_id.as_str());
    }
    if let Some(origem) = &filter.origem {
      query = query.field("origem", origem.as_str());
    }
    let options = FindOptions::new().sort(Sort::desc("criado_em"));

    let coll = self.leads().await?;
    let docs = coll
      .find(&query, &options)
      .await
      .inspect_err(|e| tracing::error!(error = %e, "get_leads failed"))?;
    docs.into_iter().map(from_document).collect()
  }

  /// Apply a partial update. The identity is addressed by `id` only; any id
  /// inside the patch was already dropped at deserialization. Always stamps
  /// `atualizado_em`.
  pub async fn update_lead(&self, id: &str, patch: LeadUpdate) -> Result<bool> {
    let mut update = UpdateDoc::new();
    if let Some(nome) = patch.nome {
      update = update.set("nome", nome);
    }
    if let Some(email) = patch.email {
      update = update.set("email", email);
    }
    if let Some(telefone) = patch.telefone {
      update = update.set("telefone", telefone);
    }
    if let Some(origem) = patch.origem {
      update = update.set("origem", origem);
    }
    if let Some(interesse) = patch.interesse {
      update = update.set("interesse", interesse);
    }
    if let Some(observacoes) = patch.observacoes {
      update = update.set("observacoes", observacoes);
    }
    if let Some(status) = patch.status {
      update = update.set("status", status.as_str());
    }
    if let Some(corretor_id) = patch.corretor_id {
      update = update.set("corretor_id", corretor_id);
    }
    if let Some(empreendimentos) = patch.empreendimentos {
      update = update.set("empreendimentos", empreendimentos);
    }
    if let Some(proximo_contato) = patch.proximo_contato {
      update = update.set("proximo_contato", proximo_contato.timestamp_micros());
    }

    self.apply_update(id, update, "update_lead").await
  }

  /// Log a contact: stamps `ultimo_contato` with the current time and
  /// overwrites `observacoes` (not appended).
  pub async fn registrar_contato(
    &self,
    id: &str,
    observacoes: &str,
  ) -> Result<bool> {
    let update = UpdateDoc::new()
      .set("ultimo_contato", now_micros().timestamp_micros())
      .set("observacoes", observacoes);
    self.apply_update(id, update, "registrar_contato").await
  }

  /// Assign an agent. Unconditionally forces status back to `contatado`,
  /// even when the lead was already further along the funnel.
  pub async fn atribuir_corretor(
    &self,
    id: &str,
    corretor_id: &str,
  ) -> Result<bool> {
    let update = UpdateDoc::new()
      .set("corretor_id", corretor_id)
      .set("status", LeadStatus::Contatado.as_str());
    self.apply_update(id, update, "atribuir_corretor").await
  }

  /// Delete a lead. Returns whether a lead with that id existed.
  pub async fn delete_lead(&self, id: &str) -> Result<bool> {
    let Some(doc_id) = DocumentId::parse(id) else {
      return Ok(false);
    };
    let coll = self.leads().await?;
    coll
      .delete_one(&Filter::by_id(doc_id))
      .await
      .inspect_err(|e| tracing::error!(lead_id = id, error = %e, "delete_lead failed"))
  }

  async fn apply_update(
    &self,
    id: &str,
    update: UpdateDoc,
    op: &'static str,
  ) -> Result<bool> {
    let Some(doc_id) = DocumentId::parse(id) else {
      return Ok(false);
    };
    let update =
      update.set("atualizado_em", now_micros().timestamp_micros());
    let coll = self.leads().await?;
    coll
      .update_one(&Filter::by_id(doc_id), &update)
      .await
      .inspect_err(|e| tracing::error!(lead_id = id, op, error = %e, "lead update failed"))
  }
}

// ─── Storage ↔ domain translation ────────────────────────────────────────────

/// Current time at microsecond granularity, matching storage precision so a
/// stamped value round-trips bit-for-bit.
fn now_micros() -> DateTime<Utc> {
  let now = Utc::now();
  DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Serialize a lead into a document body. The id stays out of the body; the
/// backend keeps identity in its own slot.
fn to_body(lead: &Lead) -> Result<Value> {
  let mut body = serde_json::to_value(lead)?;
  if let Value::Object(map) = &mut body {
    map.remove("id");
  }
  Ok(body)
}

/// Rebuild the domain lead from a stored document, converting the
/// storage-native identity into the opaque string id.
fn from_document(doc: crate::store::Document) -> Result<Lead> {
  let mut body = doc.body;
  if let Value::Object(map) = &mut body {
    map.insert("id".to_owned(), Value::String(doc.id.to_string()));
  }
  serde_json::from_value(body).map_err(Error::from)
}
