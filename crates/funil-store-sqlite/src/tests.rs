//! Integration tests for `SqliteStore` against an in-memory database.
//!
//! Covers the same contract the memory backend is tested against, so the two
//! implementations stay observably interchangeable.

use std::time::Duration;

use funil_core::{
  Error,
  lead::{LeadFilter, LeadStatus, LeadUpdate, NewLead},
  repo::LeadRepository,
  settings::SettingsStore,
  store::{
    DocumentCollection, DocumentId, DocumentStore, Filter, FindOptions, Sort,
    UpdateDoc,
  },
};
use serde_json::json;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  let store = SqliteStore::new(":memory:");
  store.connect().await.expect("in-memory store");
  store
}

async fn tick() { tokio::time::sleep(Duration::from_millis(2)).await; }

// ─── Connection lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_store_fails_to_connect() {
  let store = SqliteStore::unconfigured();
  assert!(matches!(
    store.connect().await,
    Err(Error::MissingConnectionTarget)
  ));
  assert!(!store.is_connected());
}

#[tokio::test]
async fn connect_is_idempotent_and_concurrent_safe() {
  let store = SqliteStore::new(":memory:");
  let (a, b) = tokio::join!(store.connect(), store.connect());
  a.unwrap();
  b.unwrap();
  assert!(store.is_connected());
  store.connect().await.unwrap();
}

#[tokio::test]
async fn collection_before_connect_fails() {
  let store = SqliteStore::new(":memory:");
  assert!(matches!(store.collection("leads"), Err(Error::NotConnected)));
}

#[tokio::test]
async fn close_resets_connection_state() {
  let store = store().await;
  let coll = store.collection("leads").unwrap();

  store.close().await.unwrap();
  assert!(!store.is_connected());
  assert!(matches!(store.collection("leads"), Err(Error::NotConnected)));
  assert!(matches!(
    coll.find_one(&Filter::new()).await,
    Err(Error::NotConnected)
  ));

  store.close().await.unwrap();
}

#[tokio::test]
async fn data_persists_across_reconnect_on_file_database() {
  let path = std::env::temp_dir()
    .join(format!("funil-test-{}.db", DocumentId::generate()));

  let store = SqliteStore::new(&path);
  store.connect().await.unwrap();
  let coll = store.collection("docs").unwrap();
  coll.insert_one(json!({ "n": 1 })).await.unwrap();
  store.close().await.unwrap();

  store.connect().await.unwrap();
  let coll = store.collection("docs").unwrap();
  let docs =
    coll.find(&Filter::new(), &FindOptions::new()).await.unwrap();
  assert_eq!(docs.len(), 1);

  store.close().await.unwrap();
  let _ = std::fs::remove_file(&path);
}

// ─── Collection contract ─────────────────────────────────────────────────────

#[tokio::test]
async fn find_without_sort_returns_insertion_order() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();
  for n in 0..4 {
    coll.insert_one(json!({ "n": n })).await.unwrap();
  }

  let docs =
    coll.find(&Filter::new(), &FindOptions::new()).await.unwrap();
  let ns: Vec<i64> =
    docs.iter().map(|d| d.body["n"].as_i64().unwrap()).collect();
  assert_eq!(ns, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn find_applies_sort_skip_and_limit() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();
  for n in [2, 0, 3, 1] {
    coll.insert_one(json!({ "n": n })).await.unwrap();
  }

  let options = FindOptions::new().sort(Sort::desc("n")).skip(1).limit(2);
  let docs = coll.find(&Filter::new(), &options).await.unwrap();
  let ns: Vec<i64> =
    docs.iter().map(|d| d.body["n"].as_i64().unwrap()).collect();
  assert_eq!(ns, vec![2, 1]);
}

#[tokio::test]
async fn filter_matches_json_fields() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();
  coll
    .insert_one(json!({ "status": "novo", "origem": "site" }))
    .await
    .unwrap();
  coll
    .insert_one(json!({ "status": "novo", "origem": "feira" }))
    .await
    .unwrap();
  coll
    .insert_one(json!({ "status": "perdido", "origem": "site" }))
    .await
    .unwrap();

  let filter = Filter::new().field("status", "novo").field("origem", "site");
  let docs = coll.find(&filter, &FindOptions::new()).await.unwrap();
  assert_eq!(docs.len(), 1);
  assert_eq!(docs[0].body["origem"], json!("site"));
}

#[tokio::test]
async fn null_field_filter_does_not_match_absent_field() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();
  coll.insert_one(json!({ "corretor_id": null })).await.unwrap();
  coll.insert_one(json!({})).await.unwrap();

  let filter = Filter::new().field("corretor_id", serde_json::Value::Null);
  let docs = coll.find(&filter, &FindOptions::new()).await.unwrap();
  assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn update_one_touches_only_first_match() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();
  coll.insert_one(json!({ "k": "a", "v": 1 })).await.unwrap();
  coll.insert_one(json!({ "k": "a", "v": 2 })).await.unwrap();

  let updated = coll
    .update_one(&Filter::new().field("k", "a"), &UpdateDoc::new().set("v", 9))
    .await
    .unwrap();
  assert!(updated);

  let docs =
    coll.find(&Filter::new(), &FindOptions::new()).await.unwrap();
  assert_eq!(docs[0].body["v"], json!(9));
  assert_eq!(docs[1].body["v"], json!(2));
}

#[tokio::test]
async fn update_and_delete_report_missing_targets() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();

  let missing = Filter::by_id(DocumentId::generate());
  assert!(
    !coll
      .update_one(&missing, &UpdateDoc::new().set("v", 1))
      .await
      .unwrap()
  );
  assert!(!coll.delete_one(&missing).await.unwrap());
}

#[tokio::test]
async fn delete_one_deletes_exactly_one() {
  let store = store().await;
  let coll = store.collection("docs").unwrap();
  coll.insert_one(json!({ "k": "a" })).await.unwrap();
  coll.insert_one(json!({ "k": "a" })).await.unwrap();

  assert!(coll.delete_one(&Filter::new().field("k", "a")).await.unwrap());
  let left =
    coll.find(&Filter::new(), &FindOptions::new()).await.unwrap();
  assert_eq!(left.len(), 1);
}

#[tokio::test]
async fn collections_are_isolated_by_name() {
  let store = store().await;
  let a = store.collection("a").unwrap();
  let b = store.collection("b").unwrap();
  a.insert_one(json!({ "x": 1 })).await.unwrap();

  assert!(b.find_one(&Filter::new()).await.unwrap().is_none());
}

// ─── Lead repository over SQLite ─────────────────────────────────────────────

#[tokio::test]
async fn lead_lifecycle_over_sqlite() {
  let repo = LeadRepository::new(SqliteStore::new(":memory:"));

  let created = repo
    .add_lead(NewLead {
      nome: Some("Bruno Lima".into()),
      origem: Some("anuncio".into()),
      status: Some(LeadStatus::Qualificado),
      ..NewLead::default()
    })
    .await
    .unwrap();
  assert_eq!(created.criado_em, created.atualizado_em);

  tick().await;
  assert!(
    repo
      .update_lead(
        &created.id,
        LeadUpdate { email: Some("bruno@example.com".into()), ..LeadUpdate::default() },
      )
      .await
      .unwrap()
  );
  assert!(repo.atribuir_corretor(&created.id, "corretor-2").await.unwrap());

  let lead = repo.get_lead(&created.id).await.unwrap().unwrap();
  assert_eq!(lead.email, "bruno@example.com");
  assert_eq!(lead.status, LeadStatus::Contatado);
  assert_eq!(lead.corretor_id.as_deref(), Some("corretor-2"));
  assert!(lead.atualizado_em > created.atualizado_em);

  let listed = repo
    .get_leads(&LeadFilter {
      origem: Some("anuncio".into()),
      ..LeadFilter::default()
    })
    .await
    .unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, created.id);

  assert!(repo.delete_lead(&created.id).await.unwrap());
  assert!(!repo.delete_lead(&created.id).await.unwrap());
}

#[tokio::test]
async fn get_leads_orders_newest_first() {
  let repo = LeadRepository::new(SqliteStore::new(":memory:"));
  let first = repo.add_lead(NewLead::default()).await.unwrap();
  tick().await;
  let second = repo.add_lead(NewLead::default()).await.unwrap();

  let all = repo.get_leads(&LeadFilter::default()).await.unwrap();
  let ids: Vec<&str> = all.iter().map(|l| l.id.as_str()).collect();
  assert_eq!(ids, vec![&second.id, &first.id]);
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn settings_save_then_load() {
  let store = SqliteStore::new(":memory:");
  store.save("mapbox_token", "pk.abc").await.unwrap();

  let setting = store.load("mapbox_token").await.unwrap().unwrap();
  assert_eq!(setting.valor, "pk.abc");
  assert_eq!(setting.chave, "mapbox_token");
}

#[tokio::test]
async fn settings_upsert_keeps_single_row_and_latest_value() {
  let store = store().await;
  store.save("horarios_disponiveis", "09:00,10:00").await.unwrap();
  tick().await;
  store.save("horarios_disponiveis", "14:00,15:00").await.unwrap();

  let setting =
    store.load("horarios_disponiveis").await.unwrap().unwrap();
  assert_eq!(setting.valor, "14:00,15:00");

  // The UNIQUE constraint means the upsert updated in place.
  assert_eq!(store.count_rows("configuracoes").await.unwrap(), 1);
}

#[tokio::test]
async fn settings_missing_key_is_none() {
  let store = store().await;
  assert!(store.load("mapbox_token").await.unwrap().is_none());
}
