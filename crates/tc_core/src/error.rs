//! Unified error type.
//!
//! The split that matters operationally:
//! - `Validation` is local and final; nothing was sent anywhere.
//! - `AuthExpired` / `DecryptionFailed` / `NoCredentials` mean the caller
//!   must reconfigure; they are never silently treated as success.
//! - `RateLimited` / `RemoteUnavailable` are retryable by the caller; this
//!   crate performs no retry or backoff of its own.
//! - `StoreUnavailable` is fatal to the operation and never masked by an
//!   insecure fallback for credentials.

use thiserror::Error;

use crate::platform::PlatformError;
use tc_crypto::CryptoError;
use tc_store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input. Local, never retried, reported verbatim.
    #[error("{0}")]
    Validation(String),

    /// Session handle unknown or expired. Indistinguishable on purpose.
    #[error("session is not active; reconnect with your API keys")]
    AuthExpired,

    /// Stored blob failed authentication (key mismatch or tampering).
    /// Callers treat this like `AuthExpired`; it is logged distinctly for
    /// operators and never retried.
    #[error("stored credentials could not be decrypted; reconnect with your API keys")]
    DecryptionFailed,

    /// No credential record exists for this session.
    #[error("no credentials stored for this session")]
    NoCredentials,

    /// No active thread to reply into.
    #[error("no active thread; start a new thread first")]
    NoActiveThread,

    /// The referenced root post belongs to another account.
    #[error("thread does not belong to the authenticated account")]
    NotThreadOwner,

    /// The platform rejected the credentials.
    #[error("the platform rejected the API credentials")]
    AuthInvalid,

    /// Platform rate limit. Retryable by the caller.
    #[error("platform rate limit hit; retry later")]
    RateLimited,

    /// A referenced remote object does not exist.
    #[error("remote object not found: {0}")]
    RemoteNotFound(String),

    /// The platform was unreachable or failed. Retryable by the caller. A
    /// timeout lands here too; an ambiguous outcome never advances state.
    #[error("platform unavailable: {0}")]
    RemoteUnavailable(String),

    /// The platform returned an error outside the taxonomy above.
    #[error("platform error: {0}")]
    Platform(String),

    /// The persistent store is unreachable. Fatal to the operation.
    #[error("persistent store unavailable: {0}")]
    StoreUnavailable(String),

    /// Unexpected cryptographic failure outside decryption.
    #[error("crypto failure: {0}")]
    Crypto(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Error::NoCredentials,
            other => Error::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AeadDecrypt => Error::DecryptionFailed,
            other => Error::Crypto(other.to_string()),
        }
    }
}

impl From<PlatformError> for Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::RateLimited => Error::RateLimited,
            PlatformError::AuthInvalid => Error::AuthInvalid,
            PlatformError::NotFound => Error::RemoteNotFound("post".into()),
            PlatformError::Unavailable(msg) => Error::RemoteUnavailable(msg),
            PlatformError::Api(msg) => Error::Platform(msg),
        }
    }
}
