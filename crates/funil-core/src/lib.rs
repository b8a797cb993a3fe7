//! Core types and trait definitions for the Funil lead store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod lead;
pub mod repo;
pub mod settings;
pub mod store;

pub use error::{Error, Result};
