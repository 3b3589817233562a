//! Session lifecycle.
//!
//! A session handle is an opaque bearer token minted when credentials are
//! submitted and held only by the caller. Server-side, the handle exists
//! solely as its one-way identifier hash. Expiry is advisory metadata
//! checked at validation time; there is no background sweep, and expired
//! rows simply stop resolving until housekeeping purges them.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::{config::CoreConfig, credentials::CredentialBundle, error::Error};
use tc_store::Store;

/// Opaque bearer token identifying one configured connection.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Only a truncated prefix is ever printed, mirroring what reaches logs.
impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "SessionHandle({prefix}...)")
    }
}

/// Validation outcome. Expired and unknown handles are indistinguishable to
/// callers; the difference is logged at debug level only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Valid,
    Invalid,
}

#[derive(Clone)]
pub struct SessionRegistry {
    store: Store,
    config: CoreConfig,
}

impl SessionRegistry {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Mint a handle for a validated bundle.
    ///
    /// No remote call happens here; the orchestrator verifies the
    /// credentials against the platform and destroys the session if that
    /// verification fails.
    pub fn mint(&self, bundle: &CredentialBundle) -> Result<SessionHandle, Error> {
        bundle.validate()?;
        let handle = SessionHandle(tc_crypto::token::generate_handle());
        tracing::info!(handle = ?handle, "session minted");
        Ok(handle)
    }

    /// The storage key for a handle.
    pub fn identifier_hash(&self, handle: &SessionHandle) -> String {
        tc_crypto::token::identifier_hash(handle.as_str(), &self.config.server_salt)
    }

    /// Check whether a handle currently resolves to an active session.
    pub async fn validate(&self, handle: &SessionHandle) -> Result<SessionStatus, Error> {
        let hash = self.identifier_hash(handle);
        let record = self
            .store
            .get(&hash)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        match record {
            Some(record) if self.is_expired(record.created_at) => {
                tracing::debug!(hash = %&hash[..8], "session expired");
                Ok(SessionStatus::Invalid)
            }
            Some(_) => Ok(SessionStatus::Valid),
            None => {
                tracing::debug!(hash = %&hash[..8], "session unknown");
                Ok(SessionStatus::Invalid)
            }
        }
    }

    /// Destroy a session and all vault data for its hash. Idempotent:
    /// destroying an already-destroyed session succeeds.
    pub async fn destroy(&self, handle: &SessionHandle) -> Result<(), Error> {
        let hash = self.identifier_hash(handle);
        self.store
            .delete(&hash)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        tracing::info!(hash = %&hash[..8], "session destroyed");
        Ok(())
    }

    fn is_expired(&self, created_at: DateTime<Utc>) -> bool {
        match self.config.session_ttl {
            Some(ttl) => Utc::now() >= created_at + ttl,
            None => false,
        }
    }
}
