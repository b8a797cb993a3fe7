//! SQLite backend for the Funil document store and settings store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Documents are JSON rows
//! queried with `json_extract`; the contract (ordering, match semantics,
//! error conditions) is identical to `funil-store-memory`.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;

#[cfg(test)]
mod tests;
