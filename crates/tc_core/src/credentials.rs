//! API credential bundles.
//!
//! A bundle is all-or-nothing: the five fields the platform requires are
//! either all present and non-empty, or the bundle is rejected up front.
//! Bundles are zeroized on drop, their `Debug` output is redacted, and they
//! are serialized only as the plaintext fed into the cipher — never logged,
//! never persisted unencrypted.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Error;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialBundle {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub bearer_token: String,
}

impl CredentialBundle {
    /// Reject bundles with any empty field, naming the missing ones.
    pub fn validate(&self) -> Result<(), Error> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
            ("bearer_token", &self.bearer_token),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "missing credential fields: {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialBundle(redacted)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample() -> CredentialBundle {
        CredentialBundle {
            api_key: "ck".into(),
            api_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "ats".into(),
            bearer_token: "bt".into(),
        }
    }

    #[test]
    fn complete_bundle_validates() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_field_is_named_in_error() {
        let mut bundle = sample();
        bundle.access_token = String::new();
        bundle.bearer_token = "  ".into();
        let err = bundle.validate().unwrap_err();
        match err {
            Error::Validation(msg) => {
                assert!(msg.contains("access_token"));
                assert!(msg.contains("bearer_token"));
                assert!(!msg.contains("api_key"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn debug_is_redacted() {
        let bundle = sample();
        let printed = format!("{bundle:?}");
        assert_eq!(printed, "CredentialBundle(redacted)");
        assert!(!printed.contains("ck"));
    }
}
