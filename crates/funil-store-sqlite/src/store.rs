//! [`SqliteStore`] — the SQLite implementation of [`DocumentStore`] and
//! [`SettingsStore`].

use std::{
  path::PathBuf,
  sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::Utc;
use funil_core::{
  Error, Result,
  settings::{Setting, SettingsStore},
  store::{
    Direction, Document, DocumentCollection, DocumentId, DocumentStore,
    Filter, FindOptions, UpdateDoc,
  },
};
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use serde_json::Value;

use crate::{
  encode::{CorruptRow, decode_dt, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Funil document store backed by a single SQLite file.
///
/// The connection target (database path) is fixed at construction and the
/// physical connection is established lazily by `connect()`. Cloning is
/// cheap — clones share the connection and its state.
#[derive(Clone)]
pub struct SqliteStore {
  inner: Arc<Inner>,
}

struct Inner {
  target:    Option<PathBuf>,
  connected: AtomicBool,
  /// Serializes connection establishment so concurrent `connect()` callers
  /// share a single physical attempt.
  gate:      tokio::sync::Mutex<()>,
  conn:      RwLock<Option<tokio_rusqlite::Connection>>,
}

impl Inner {
  fn conn(&self) -> Result<tokio_rusqlite::Connection> {
    if !self.connected.load(Ordering::Acquire) {
      return Err(Error::NotConnected);
    }
    self
      .conn
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
      .ok_or(Error::NotConnected)
  }
}

impl SqliteStore {
  /// A store that will connect to the database at `target`. Use `":memory:"`
  /// for an in-memory database (tests).
  pub fn new(target: impl Into<PathBuf>) -> Self {
    Self::build(Some(target.into()))
  }

  /// A store with no connection target configured; `connect()` fails with
  /// [`Error::MissingConnectionTarget`]. Mirrors a deployment with a missing
  /// database setting.
  pub fn unconfigured() -> Self { Self::build(None) }

  fn build(target: Option<PathBuf>) -> Self {
    Self {
      inner: Arc::new(Inner {
        target,
        connected: AtomicBool::new(false),
        gate: tokio::sync::Mutex::new(()),
        conn: RwLock::new(None),
      }),
    }
  }
}

impl DocumentStore for SqliteStore {
  type Collection = SqliteCollection;

  async fn connect(&self) -> Result<()> {
    if self.is_connected() {
      return Ok(());
    }
    let _guard = self.inner.gate.lock().await;
    // A concurrent caller may have finished connecting while we waited.
    if self.is_connected() {
      return Ok(());
    }

    let target = self
      .inner
      .target
      .clone()
      .ok_or(Error::MissingConnectionTarget)?;
    let conn = tokio_rusqlite::Connection::open(target)
      .await
      .map_err(Error::storage)?;
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(Error::storage)?;

    *self.inner.conn.write().unwrap_or_else(PoisonError::into_inner) =
      Some(conn);
    self.inner.connected.store(true, Ordering::Release);
    Ok(())
  }

  async fn close(&self) -> Result<()> {
    self.inner.connected.store(false, Ordering::Release);
    let conn = self
      .inner
      .conn
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(conn) = conn {
      // The dedicated connection thread shuts down with the last handle;
      // a close error still leaves the store in the not-connected state.
      conn.close().await.map_err(Error::storage)?;
    }
    Ok(())
  }

  fn is_connected(&self) -> bool {
    self.inner.connected.load(Ordering::Acquire)
  }

  fn collection(&self, name: &str) -> Result<SqliteCollection> {
    if !self.is_connected() {
      return Err(Error::NotConnected);
    }
    Ok(SqliteCollection {
      inner: Arc::clone(&self.inner),
      name:  name.to_owned(),
    })
  }
}

// ─── SQL building ────────────────────────────────────────────────────────────

/// Append the condition and parameters for one field-equality clause.
///
/// Field names are plain identifiers (no dots or quotes), so `$.{name}` is a
/// valid JSON path; the path itself is bound as a parameter, never spliced.
/// `json_type` distinguishes JSON null (and booleans) from an absent field,
/// matching `Filter::matches`.
fn push_field_clause(
  conds: &mut Vec<String>,
  params: &mut Vec<SqlValue>,
  name: &str,
  value: &Value,
) {
  let path = SqlValue::Text(format!("$.{name}"));
  match value {
    Value::Null => {
      conds.push("json_type(body, ?) = 'null'".to_owned());
      params.push(path);
    }
    Value::Bool(b) => {
      conds.push("json_type(body, ?) = ?".to_owned());
      params.push(path);
      params.push(SqlValue::Text(if *b { "true" } else { "false" }.to_owned()));
    }
    Value::Number(n) => {
      conds.push("json_extract(body, ?) = ?".to_owned());
      params.push(path);
      params.push(match n.as_i64() {
        Some(i) => SqlValue::Integer(i),
        None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
      });
    }
    Value::String(s) => {
      conds.push("json_extract(body, ?) = ?".to_owned());
      params.push(path);
      params.push(SqlValue::Text(s.clone()));
    }
    // Arrays/objects compare by SQLite's minified JSON text; filters are
    // expected to be scalar in practice.
    other => {
      conds.push("json_extract(body, ?) = ?".to_owned());
      params.push(path);
      params.push(SqlValue::Text(other.to_string()));
    }
  }
}

/// `WHERE` clause (collection scope + filter) and its parameters.
fn where_clause(colecao: &str, filter: &Filter) -> (String, Vec<SqlValue>) {
  let mut conds = vec!["colecao = ?".to_owned()];
  let mut params = vec![SqlValue::Text(colecao.to_owned())];

  if let Some(id) = filter.id() {
    conds.push("doc_id = ?".to_owned());
    params.push(SqlValue::Text(id.to_string()));
  }
  for (name, value) in filter.fields() {
    push_field_clause(&mut conds, &mut params, name, value);
  }

  (conds.join(" AND "), params)
}

/// Full `SELECT doc_id, body` statement for `find`, including ordering and
/// pagination. `rowid` is the tiebreaker so equal sort keys keep insertion
/// order, like the reference stable sort.
fn select_sql(
  colecao: &str,
  filter: &Filter,
  options: &FindOptions,
) -> (String, Vec<SqlValue>) {
  let (where_sql, mut params) = where_clause(colecao, filter);

  let order = match &options.sort {
    Some(sort) => {
      params.push(SqlValue::Text(format!("$.{}", sort.key())));
      let dir = match sort.direction() {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
      };
      format!("json_extract(body, ?) {dir}, rowid")
    }
    None => "rowid".to_owned(),
  };

  params.push(SqlValue::Integer(
    options.limit.map_or(-1, |l| l as i64),
  ));
  params.push(SqlValue::Integer(
    options.skip.unwrap_or(0) as i64,
  ));

  let sql = format!(
    "SELECT doc_id, body FROM documentos
     WHERE {where_sql}
     ORDER BY {order}
     LIMIT ? OFFSET ?"
  );
  (sql, params)
}

fn decode_document(doc_id: &str, body: &str) -> Result<Document> {
  let id = DocumentId::parse(doc_id)
    .ok_or_else(|| Error::storage(CorruptRow(format!("bad doc_id {doc_id:?}"))))?;
  let body: Value = serde_json::from_str(body)?;
  Ok(Document { id, body })
}

fn other_err(
  e: impl std::error::Error + Send + Sync + 'static,
) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// Handle bound to one named collection of a [`SqliteStore`].
#[derive(Clone)]
pub struct SqliteCollection {
  inner: Arc<Inner>,
  name:  String,
}

impl DocumentCollection for SqliteCollection {
  async fn insert_one(&self, body: Value) -> Result<DocumentId> {
    let conn = self.inner.conn()?;
    let id = DocumentId::generate();
    let id_text = id.to_string();
    let colecao = self.name.clone();
    let body_text = serde_json::to_string(&body)?;

    conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documentos (doc_id, colecao, body) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_text, colecao, body_text],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::storage)?;
    Ok(id)
  }

  async fn find(
    &self,
    filter: &Filter,
    options: &FindOptions,
  ) -> Result<Vec<Document>> {
    let conn = self.inner.conn()?;
    let (sql, params) = select_sql(&self.name, filter, options);

    let rows: Vec<(String, String)> = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::storage)?;

    rows
      .into_iter()
      .map(|(doc_id, body)| decode_document(&doc_id, &body))
      .collect()
  }

  async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
    let docs = self.find(filter, &FindOptions::new().limit(1)).await?;
    Ok(docs.into_iter().next())
  }

  /// Select-then-write runs inside a single `conn.call` closure; the
  /// connection is single-threaded, so the pair cannot interleave with other
  /// operations.
  async fn update_one(
    &self,
    filter: &Filter,
    update: &UpdateDoc,
  ) -> Result<bool> {
    let conn = self.inner.conn()?;
    let (where_sql, params) = where_clause(&self.name, filter);
    let sql = format!(
      "SELECT doc_id, body FROM documentos
       WHERE {where_sql}
       ORDER BY rowid
       LIMIT 1"
    );
    let update = update.clone();

    conn
      .call(move |conn| {
        let row: Option<(String, String)> = conn
          .query_row(&sql, rusqlite::params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })
          .optional()?;
        let Some((doc_id, body_text)) = row else {
          return Ok(false);
        };

        let mut body: Value =
          serde_json::from_str(&body_text).map_err(other_err)?;
        update.apply(&mut body);
        let new_text = serde_json::to_string(&body).map_err(other_err)?;

        conn.execute(
          "UPDATE documentos SET body = ?1 WHERE doc_id = ?2",
          rusqlite::params![new_text, doc_id],
        )?;
        Ok(true)
      })
      .await
      .map_err(Error::storage)
  }

  async fn delete_one(&self, filter: &Filter) -> Result<bool> {
    let conn = self.inner.conn()?;
    let (where_sql, params) = where_clause(&self.name, filter);
    let sql = format!(
      "DELETE FROM documentos WHERE doc_id = (
         SELECT doc_id FROM documentos
         WHERE {where_sql}
         ORDER BY rowid
         LIMIT 1
       )"
    );

    let deleted = conn
      .call(move |conn| {
        let n = conn.execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(n > 0)
      })
      .await
      .map_err(Error::storage)?;
    Ok(deleted)
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Raw row count for a table; test observability only.
  pub(crate) async fn count_rows(&self, table: &'static str) -> Result<i64> {
    let conn = self.inner.conn()?;
    conn
      .call(move |conn| {
        let n = conn.query_row(
          &format!("SELECT COUNT(*) FROM {table}"),
          [],
          |row| row.get(0),
        )?;
        Ok(n)
      })
      .await
      .map_err(Error::storage)
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

impl SettingsStore for SqliteStore {
  /// Atomic upsert against the UNIQUE key column; concurrent writers for the
  /// same key cannot both insert.
  async fn save(&self, chave: &str, valor: &str) -> Result<()> {
    self.connect().await?;
    let conn = self.inner.conn()?;
    let chave = chave.to_owned();
    let valor = valor.to_owned();
    let atualizado_em = encode_dt(Utc::now());

    conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO configuracoes (chave, valor, atualizado_em)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(chave) DO UPDATE SET
             valor = excluded.valor,
             atualizado_em = excluded.atualizado_em",
          rusqlite::params![chave, valor, atualizado_em],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::storage)
  }

  /// Latest-wins by `atualizado_em`, tolerating duplicate rows left behind
  /// by databases predating the uniqueness constraint.
  async fn load(&self, chave: &str) -> Result<Option<Setting>> {
    self.connect().await?;
    let conn = self.inner.conn()?;
    let chave = chave.to_owned();

    let row: Option<(String, String, String)> = conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT chave, valor, atualizado_em FROM configuracoes
             WHERE chave = ?1
             ORDER BY atualizado_em DESC
             LIMIT 1",
            rusqlite::params![chave],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )
          .optional()?;
        Ok(row)
      })
      .await
      .map_err(Error::storage)?;

    row
      .map(|(chave, valor, atualizado_em)| {
        Ok(Setting {
          chave,
          valor,
          atualizado_em: decode_dt(&atualizado_em)?,
        })
      })
      .transpose()
  }
}
