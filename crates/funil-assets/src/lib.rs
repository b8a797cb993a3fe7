//! Resource upload service — binary-asset storage with metadata tracking.
//!
//! [`AssetVault`] keeps a registry of uploaded files (content base64-encoded
//! alongside metadata) persisted to a local JSON file, standing in for an
//! external drive platform. It has its own connect → operate lifecycle,
//! independent of the document store.

pub mod error;
mod vault;

pub use error::{Error, Result};
pub use vault::{AssetRecord, AssetVault, FileUpload, VaultConfig};
