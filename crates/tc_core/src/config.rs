//! Runtime configuration.
//!
//! Everything secret or deployment-specific is injected here explicitly so
//! tests can substitute deterministic values. There is no ambient global
//! state.

use std::env;
use std::path::PathBuf;

use chrono::Duration;

use crate::error::Error;
use tc_crypto::kdf::MasterSecret;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Platform post length limit, in Unicode scalar values.
pub const MAX_POST_CHARS: usize = 280;

const ENV_MASTER_SECRET: &str = "THREADCRAFT_MASTER_SECRET";
const ENV_SERVER_SALT: &str = "THREADCRAFT_SERVER_SALT";
const ENV_SESSION_TTL_HOURS: &str = "THREADCRAFT_SESSION_TTL_HOURS";
const ENV_PROGRESS_FALLBACK: &str = "THREADCRAFT_PROGRESS_FALLBACK";

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Process-wide encryption secret, loaded once at startup.
    pub master_secret: MasterSecret,
    /// Salt mixed into identifier hashes so raw handles never key the store.
    pub server_salt: String,
    /// Session lifetime from creation. `None` disables expiry.
    pub session_ttl: Option<Duration>,
    /// Optional file fallback for day counters during store outages.
    /// Credentials never touch this path.
    pub progress_fallback: Option<PathBuf>,
}

impl CoreConfig {
    pub fn new(master_secret: MasterSecret, server_salt: impl Into<String>) -> Self {
        Self {
            master_secret,
            server_salt: server_salt.into(),
            session_ttl: Some(Duration::hours(DEFAULT_SESSION_TTL_HOURS)),
            progress_fallback: None,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_progress_fallback(mut self, path: Option<PathBuf>) -> Self {
        self.progress_fallback = path;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// `THREADCRAFT_MASTER_SECRET` (base64url, 32 bytes) and
    /// `THREADCRAFT_SERVER_SALT` are required; `THREADCRAFT_SESSION_TTL_HOURS`
    /// (0 = never expire) and `THREADCRAFT_PROGRESS_FALLBACK` are optional.
    pub fn from_env() -> Result<Self, Error> {
        let master_secret = env::var(ENV_MASTER_SECRET)
            .map_err(|_| Error::Validation(format!("{ENV_MASTER_SECRET} is not set")))
            .and_then(|raw| {
                MasterSecret::from_base64(&raw)
                    .map_err(|e| Error::Validation(format!("{ENV_MASTER_SECRET}: {e}")))
            })?;
        let server_salt = env::var(ENV_SERVER_SALT)
            .map_err(|_| Error::Validation(format!("{ENV_SERVER_SALT} is not set")))?;

        let session_ttl = match env::var(ENV_SESSION_TTL_HOURS) {
            Ok(raw) => {
                let hours: i64 = raw.parse().map_err(|_| {
                    Error::Validation(format!("{ENV_SESSION_TTL_HOURS}: not a number: {raw}"))
                })?;
                if hours < 0 {
                    return Err(Error::Validation(format!(
                        "{ENV_SESSION_TTL_HOURS}: must not be negative"
                    )));
                }
                if hours == 0 {
                    None
                } else {
                    Some(Duration::hours(hours))
                }
            }
            Err(_) => Some(Duration::hours(DEFAULT_SESSION_TTL_HOURS)),
        };

        let progress_fallback = env::var(ENV_PROGRESS_FALLBACK).ok().map(PathBuf::from);

        Ok(Self {
            master_secret,
            server_salt,
            session_ttl,
            progress_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_24h_ttl() {
        let config = CoreConfig::new(MasterSecret::generate(), "salt");
        assert_eq!(config.session_ttl, Some(Duration::hours(24)));
        assert!(config.progress_fallback.is_none());
    }

    #[test]
    fn ttl_can_be_disabled() {
        let config = CoreConfig::new(MasterSecret::generate(), "salt").with_session_ttl(None);
        assert!(config.session_ttl.is_none());
    }

    #[test]
    fn debug_does_not_leak_master_secret() {
        let config = CoreConfig::new(MasterSecret::generate(), "salt");
        let printed = format!("{config:?}");
        assert!(printed.contains("MasterSecret(redacted)"));
    }
}
