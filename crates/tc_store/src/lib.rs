//! tc_store — persistent storage for encrypted vault records
//!
//! # Encryption strategy
//! SQLite does NOT natively encrypt.  We use application-level encryption:
//! - Sensitive columns (credential bundles, thread references) arrive here
//!   already as XChaCha20-Poly1305 ciphertext, base64-encoded. This crate
//!   never sees a key or a plaintext secret.
//! - Non-sensitive metadata (day counter, timestamps, identifier hashes) is
//!   stored in plaintext to allow efficient queries.
//!
//! Rows are keyed solely by the identifier hash; raw session handles never
//! appear in persisted storage.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on first open.

pub mod db;
pub mod error;
pub mod models;
pub mod progress_file;

pub use db::Store;
pub use error::StoreError;
pub use models::VaultRecord;
pub use progress_file::ProgressFile;
