//! tc_core — session-scoped credential vault and thread-progress tracker
//!
//! A caller submits raw platform credentials and receives an opaque session
//! handle. Credentials are AEAD-encrypted under a key derived from the
//! handle plus a server-side master secret and persisted keyed by a one-way
//! hash of the handle. Later calls present the handle; the vault decrypts
//! on demand and the tracker posts day-by-day replies into a single thread,
//! advancing the stored day counter only after the platform confirms each
//! post.
//!
//! # Module layout
//! - `credentials`  — the five-field API credential bundle
//! - `session`      — handle lifecycle (mint / validate / destroy)
//! - `vault`        — encrypted credential persistence
//! - `progress`     — day tracking: start / continue / post / reset
//! - `platform`     — remote platform capability trait + types
//! - `api`          — concrete X API v2 client (OAuth 1.0a + bearer)
//! - `thread_ref`   — thread URL/ID normalization, day-marker scanning
//! - `orchestrator` — thin coordination layer binding the above
//! - `config`       — explicit runtime configuration
//! - `error`        — unified error type

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod platform;
pub mod progress;
pub mod session;
pub mod thread_ref;
pub mod vault;

pub use config::CoreConfig;
pub use credentials::CredentialBundle;
pub use error::Error;
pub use orchestrator::Orchestrator;
pub use platform::{PlatformClient, PlatformError, Post, PostId, Profile};
pub use progress::{PostPreview, PostedDay, ProgressSnapshot, ThreadProgress};
pub use session::{SessionHandle, SessionStatus};
