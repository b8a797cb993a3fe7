//! Lead — the prospective-customer record tracked through the sales funnel.
//!
//! Domain field names stay in Portuguese, matching the wire shape the UI and
//! storage already use. Timestamps serialize as microsecond integers
//! (`chrono::serde::ts_microseconds`) so both storage backends order them
//! numerically and identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Funnel stage of a lead. The value set is fixed; transitions are free-form
/// (no enforced state machine).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
  #[default]
  Novo,
  Contatado,
  Qualificado,
  Oportunidade,
  Convertido,
  Perdido,
}

impl LeadStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Novo => "novo",
      Self::Contatado => "contatado",
      Self::Qualificado => "qualificado",
      Self::Oportunidade => "oportunidade",
      Self::Convertido => "convertido",
      Self::Perdido => "perdido",
    }
  }
}

// ─── Domain entity ───────────────────────────────────────────────────────────

/// A fully-materialized lead as returned to callers.
///
/// `id` is an opaque string derived from the storage-assigned identity at
/// creation and immutable afterwards. `criado_em` is set once at insert;
/// `atualizado_em` is refreshed on every mutation and never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
  pub id:              String,
  pub nome:            String,
  pub email:           String,
  pub telefone:        String,
  pub origem:          String,
  pub interesse:       String,
  #[serde(default)]
  pub observacoes:     Option<String>,
  #[serde(default)]
  pub status:          LeadStatus,
  #[serde(default)]
  pub corretor_id:     Option<String>,
  #[serde(default)]
  pub empreendimentos: Option<Vec<String>>,
  #[serde(with = "chrono::serde::ts_microseconds")]
  pub criado_em:       DateTime<Utc>,
  #[serde(with = "chrono::serde::ts_microseconds")]
  pub atualizado_em:   DateTime<Utc>,
  #[serde(default, with = "chrono::serde::ts_microseconds_option")]
  pub ultimo_contato:  Option<DateTime<Utc>>,
  #[serde(default, with = "chrono::serde::ts_microseconds_option")]
  pub proximo_contato: Option<DateTime<Utc>>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Partial input for lead creation. Unset required strings default to empty;
/// unset status defaults to [`LeadStatus::Novo`]. Unknown fields in a JSON
/// payload (including a smuggled `id`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
  pub nome:            Option<String>,
  pub email:           Option<String>,
  pub telefone:        Option<String>,
  pub origem:          Option<String>,
  pub interesse:       Option<String>,
  pub observacoes:     Option<String>,
  pub status:          Option<LeadStatus>,
  pub corretor_id:     Option<String>,
  pub empreendimentos: Option<Vec<String>>,
  #[serde(default, with = "chrono::serde::ts_microseconds_option")]
  pub proximo_contato: Option<DateTime<Utc>>,
}

/// Partial patch for lead mutation. Two fields are deliberately absent: `id`
/// (the identity is addressed separately and is immutable) and
/// `ultimo_contato` (stamped only by the contact-log operation). Either one
/// in the caller's payload is dropped on deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadUpdate {
  pub nome:            Option<String>,
  pub email:           Option<String>,
  pub telefone:        Option<String>,
  pub origem:          Option<String>,
  pub interesse:       Option<String>,
  pub observacoes:     Option<String>,
  pub status:          Option<LeadStatus>,
  pub corretor_id:     Option<String>,
  pub empreendimentos: Option<Vec<String>>,
  #[serde(default, with = "chrono::serde::ts_microseconds_option")]
  pub proximo_contato: Option<DateTime<Utc>>,
}

/// Listing filter. Present fields are AND-combined; absent fields impose no
/// constraint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
  pub status:      Option<LeadStatus>,
  pub corretor_id: Option<String>,
  pub origem:      Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_wire_values_are_lowercase_portuguese() {
    let v = serde_json::to_value(LeadStatus::Oportunidade).unwrap();
    assert_eq!(v, serde_json::json!("oportunidade"));
    let s: LeadStatus = serde_json::from_str("\"perdido\"").unwrap();
    assert_eq!(s, LeadStatus::Perdido);
  }

  #[test]
  fn lead_update_ignores_id_and_ultimo_contato_in_payload() {
    let patch: LeadUpdate = serde_json::from_str(
      r#"{"id":"evil","ultimo_contato":123,"nome":"Ana"}"#,
    )
    .unwrap();
    assert_eq!(patch.nome.as_deref(), Some("Ana"));
  }

  #[test]
  fn timestamps_serialize_as_integers() {
    let lead = Lead {
      id:              "x".into(),
      nome:            String::new(),
      email:           String::new(),
      telefone:        String::new(),
      origem:          String::new(),
      interesse:       String::new(),
      observacoes:     None,
      status:          LeadStatus::default(),
      corretor_id:     None,
      empreendimentos: None,
      criado_em:       Utc::now(),
      atualizado_em:   Utc::now(),
      ultimo_contato:  None,
      proximo_contato: None,
    };
    let v = serde_json::to_value(&lead).unwrap();
    assert!(v["criado_em"].is_i64());
    assert!(v["ultimo_contato"].is_null());
  }
}
