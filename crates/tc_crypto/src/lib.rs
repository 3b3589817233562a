//! tc_crypto — ThreadCraft cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Per-session keys always mix in the process-wide master secret, so a
//!   leaked session handle alone cannot decrypt stored blobs.
//!
//! # Module layout
//! - `aead`  — XChaCha20-Poly1305 encrypt/decrypt helpers
//! - `kdf`   — master secret + HKDF-SHA256 per-session key derivation
//! - `token` — session handle generation and identifier hashing
//! - `error` — unified error type

pub mod aead;
pub mod error;
pub mod kdf;
pub mod token;

pub use error::CryptoError;
