//! Record-array-backed mock backend for the Funil document store.
//!
//! Implements the same contract as `funil-store-sqlite` — same ordering,
//! same error conditions — so it can stand in for the real backend in tests
//! and local development. Filter, sort and pagination semantics are the
//! shared reference implementations from `funil-core`.

mod store;

pub use store::MemoryStore;
