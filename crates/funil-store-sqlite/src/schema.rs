//! SQL schema for the Funil SQLite backend.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The `documentos.body` column holds a JSON object; the document identity
/// lives only in `doc_id` and is never stored inside the body. Insertion
/// order is the implicit rowid.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS documentos (
    doc_id  TEXT NOT NULL PRIMARY KEY,
    colecao TEXT NOT NULL,
    body    TEXT NOT NULL    -- JSON object
);

CREATE INDEX IF NOT EXISTS documentos_colecao_idx ON documentos(colecao);

-- One row per key. Databases created before the UNIQUE constraint may carry
-- duplicate rows; reads resolve latest-wins by atualizado_em.
CREATE TABLE IF NOT EXISTS configuracoes (
    chave         TEXT NOT NULL UNIQUE,
    valor         TEXT NOT NULL,
    atualizado_em TEXT NOT NULL    -- RFC 3339 UTC, microsecond precision
);

PRAGMA user_version = 1;
";
