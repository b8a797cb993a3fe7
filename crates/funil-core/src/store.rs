//! The `DocumentStore` / `DocumentCollection` traits and supporting query
//! types.
//!
//! The traits are implemented by storage backends (`funil-store-memory`,
//! `funil-store-sqlite`). Higher layers (`funil-api`, the
//! [`LeadRepository`](crate::repo::LeadRepository)) depend on this
//! abstraction, not on any concrete backend. Both backends must agree on
//! observable behavior — ordering, match semantics, error conditions — so the
//! evaluation semantics (`Filter::matches`, `FindOptions::apply`,
//! `UpdateDoc::apply`) are defined here once and reused by in-process
//! backends.

use std::{cmp::Ordering, fmt, future::Future};

use serde_json::Value;
use uuid::Uuid;

use crate::Result;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Storage-native document identity, assigned by the backend at insert.
///
/// This type never crosses the repository boundary: domain entities carry an
/// opaque string id instead, and the repository converts in exactly one
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
  /// Mint a fresh identity. Called by backends, never by domain code.
  pub fn generate() -> Self { Self(Uuid::new_v4()) }

  /// Parse a domain-side opaque id back into a storage identity.
  /// Returns `None` for strings that cannot address any document.
  pub fn parse(s: &str) -> Option<Self> { Uuid::parse_str(s).ok().map(Self) }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A stored document: identity plus a JSON object body. The body never
/// contains the identity; backends keep it in a dedicated column/slot.
#[derive(Debug, Clone)]
pub struct Document {
  pub id:   DocumentId,
  pub body: Value,
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Conjunction of field-equality clauses over document bodies, with an
/// optional identity clause. An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  id:     Option<DocumentId>,
  fields: Vec<(String, Value)>,
}

impl Filter {
  pub fn new() -> Self { Self::default() }

  /// Filter that matches at most the document with the given identity.
  pub fn by_id(id: DocumentId) -> Self {
    Self { id: Some(id), fields: Vec::new() }
  }

  /// Add a field-equality clause. Clauses are AND-combined.
  pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.push((name.into(), value.into()));
    self
  }

  pub fn id(&self) -> Option<DocumentId> { self.id }

  pub fn fields(&self) -> &[(String, Value)] { &self.fields }

  pub fn is_empty(&self) -> bool { self.id.is_none() && self.fields.is_empty() }

  /// Reference match semantics, shared by in-process backends.
  ///
  /// A field clause matches only when the field is present and equal; a
  /// missing field never matches, not even against `null`.
  pub fn matches(&self, doc: &Document) -> bool {
    if let Some(id) = self.id
      && id != doc.id
    {
      return false;
    }
    self
      .fields
      .iter()
      .all(|(name, value)| doc.body.get(name) == Some(value))
  }
}

// ─── Sort ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending,
}

/// Single-key ordering over a body field.
#[derive(Debug, Clone)]
pub struct Sort {
  key:       String,
  direction: Direction,
}

impl Sort {
  pub fn asc(key: impl Into<String>) -> Self {
    Self { key: key.into(), direction: Direction::Ascending }
  }

  pub fn desc(key: impl Into<String>) -> Self {
    Self { key: key.into(), direction: Direction::Descending }
  }

  pub fn key(&self) -> &str { &self.key }

  pub fn direction(&self) -> Direction { self.direction }

  /// Compare two documents by the sort key. Missing fields order before
  /// present ones (ascending), mirroring SQLite's NULL placement.
  pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
    let ord = compare_values(a.body.get(&self.key), b.body.get(&self.key));
    match self.direction {
      Direction::Ascending => ord,
      Direction::Descending => ord.reverse(),
    }
  }
}

/// Total order over optional JSON scalars: absent < null < bool < number <
/// string. Sort keys are expected to be same-typed across a collection; the
/// cross-type order exists only so the comparison is total.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  fn rank(v: Option<&Value>) -> u8 {
    match v {
      None => 0,
      Some(Value::Null) => 1,
      Some(Value::Bool(_)) => 2,
      Some(Value::Number(_)) => 3,
      Some(Value::String(_)) => 4,
      Some(_) => 5,
    }
  }

  match (a, b) {
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    (Some(Value::Number(x)), Some(Value::Number(y))) => {
      let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    _ => rank(a).cmp(&rank(b)),
  }
}

// ─── Find options ────────────────────────────────────────────────────────────

/// Cursor options: ordering and pagination, applied after filtering.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
  pub sort:  Option<Sort>,
  pub limit: Option<usize>,
  pub skip:  Option<usize>,
}

impl FindOptions {
  pub fn new() -> Self { Self::default() }

  pub fn sort(mut self, sort: Sort) -> Self {
    self.sort = Some(sort);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn skip(mut self, skip: usize) -> Self {
    self.skip = Some(skip);
    self
  }

  /// Reference evaluation: sort (stable, so unsorted input keeps insertion
  /// order among equal keys), then skip, then limit.
  pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
    if let Some(sort) = &self.sort {
      docs.sort_by(|a, b| sort.compare(a, b));
    }
    let skip = self.skip.unwrap_or(0);
    let mut docs: Vec<Document> =
      docs.into_iter().skip(skip).collect();
    if let Some(limit) = self.limit {
      docs.truncate(limit);
    }
    docs
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// A set of field assignments applied to a document body. Never touches the
/// document identity.
#[derive(Debug, Clone, Default)]
pub struct UpdateDoc {
  sets: Vec<(String, Value)>,
}

impl UpdateDoc {
  pub fn new() -> Self { Self::default() }

  pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.sets.push((name.into(), value.into()));
    self
  }

  pub fn sets(&self) -> &[(String, Value)] { &self.sets }

  pub fn is_empty(&self) -> bool { self.sets.is_empty() }

  /// Apply the assignments in order to a JSON object body.
  pub fn apply(&self, body: &mut Value) {
    if let Value::Object(map) = body {
      for (name, value) in &self.sets {
        map.insert(name.clone(), value.clone());
      }
    }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Abstraction over a document-oriented backend with a connect → operate →
/// close lifecycle.
///
/// Contract:
/// - `connect` is idempotent, and concurrent callers must be serialized
///   behind a single in-flight attempt — exactly one physical connection is
///   ever established.
/// - `collection` fails with [`Error::NotConnected`](crate::Error) before a
///   successful connect.
/// - `close` is idempotent and resets the store to not-connected.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Collection: DocumentCollection;

  /// Establish the connection if not already established.
  fn connect(&self) -> impl Future<Output = Result<()>> + Send + '_;

  /// Release the connection. No-op if never connected.
  fn close(&self) -> impl Future<Output = Result<()>> + Send + '_;

  /// Pure state query, no side effects.
  fn is_connected(&self) -> bool;

  /// A cheap handle bound to the named collection.
  fn collection(&self, name: &str) -> Result<Self::Collection>;
}

/// Single-document operations over one named collection.
pub trait DocumentCollection: Send + Sync {
  /// Insert a new document body; the backend assigns the identity.
  fn insert_one(
    &self,
    body: Value,
  ) -> impl Future<Output = Result<DocumentId>> + Send + '_;

  /// Materialize all matching documents, ordered per `options`. Without a
  /// sort, documents come back in insertion order.
  fn find<'a>(
    &'a self,
    filter: &'a Filter,
    options: &'a FindOptions,
  ) -> impl Future<Output = Result<Vec<Document>>> + Send + 'a;

  /// First matching document in insertion order, if any.
  fn find_one<'a>(
    &'a self,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + 'a;

  /// Apply `update` to the first matching document. Returns whether a
  /// document matched.
  fn update_one<'a>(
    &'a self,
    filter: &'a Filter,
    update: &'a UpdateDoc,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// Delete the first matching document. Returns whether a document was
  /// deleted.
  fn delete_one<'a>(
    &'a self,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn doc(body: Value) -> Document {
    Document { id: DocumentId::generate(), body }
  }

  #[test]
  fn empty_filter_matches_everything() {
    let f = Filter::new();
    assert!(f.matches(&doc(json!({ "a": 1 }))));
    assert!(f.matches(&doc(json!({}))));
  }

  #[test]
  fn field_clauses_are_and_combined() {
    let f = Filter::new().field("status", "novo").field("origem", "site");
    assert!(f.matches(&doc(json!({ "status": "novo", "origem": "site" }))));
    assert!(!f.matches(&doc(json!({ "status": "novo", "origem": "feira" }))));
  }

  #[test]
  fn missing_field_does_not_match_null() {
    let f = Filter::new().field("corretor_id", Value::Null);
    assert!(f.matches(&doc(json!({ "corretor_id": null }))));
    assert!(!f.matches(&doc(json!({}))));
  }

  #[test]
  fn id_filter_only_matches_that_document() {
    let d = doc(json!({}));
    assert!(Filter::by_id(d.id).matches(&d));
    assert!(!Filter::by_id(DocumentId::generate()).matches(&d));
  }

  #[test]
  fn sort_desc_then_skip_then_limit() {
    let docs = vec![
      doc(json!({ "n": 1 })),
      doc(json!({ "n": 3 })),
      doc(json!({ "n": 2 })),
      doc(json!({ "n": 4 })),
    ];
    let opts = FindOptions::new().sort(Sort::desc("n")).skip(1).limit(2);
    let out = opts.apply(docs);
    let ns: Vec<i64> =
      out.iter().map(|d| d.body["n"].as_i64().unwrap()).collect();
    assert_eq!(ns, vec![3, 2]);
  }

  #[test]
  fn missing_sort_key_orders_last_descending() {
    let docs = vec![doc(json!({})), doc(json!({ "n": 1 }))];
    let out = FindOptions::new().sort(Sort::desc("n")).apply(docs);
    assert!(out[0].body.get("n").is_some());
    assert!(out[1].body.get("n").is_none());
  }

  #[test]
  fn update_doc_applies_sets_in_order() {
    let mut body = json!({ "a": 1 });
    UpdateDoc::new().set("a", 2).set("b", "x").apply(&mut body);
    assert_eq!(body, json!({ "a": 2, "b": "x" }));
  }

  #[test]
  fn document_id_round_trips_through_display() {
    let id = DocumentId::generate();
    assert_eq!(DocumentId::parse(&id.to_string()), Some(id));
    assert_eq!(DocumentId::parse("not-a-uuid"), None);
  }
}
