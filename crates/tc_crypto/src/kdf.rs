//! Key derivation.
//!
//! `credential_key` derives the 32-byte AEAD key for one session from the
//! process-wide master secret and the session handle. Derivation is
//! deterministic per (master, handle), so independent requests within a
//! session decrypt the same stored blob without holding per-session key
//! material in memory between requests. Rotating the master secret
//! invalidates every stored blob, which surfaces as a decryption failure
//! and forces reconnection.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroizing, ZeroizeOnDrop};

use crate::error::CryptoError;

pub const MASTER_SECRET_LEN: usize = 32;

const CREDENTIAL_KEY_INFO: &[u8] = b"tc-credential-key-v1";

/// Process-wide encryption secret. Explicit configuration loaded once at
/// startup; never ambient global state, never derived from user input alone.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterSecret([u8; MASTER_SECRET_LEN]);

impl MasterSecret {
    pub fn new(bytes: [u8; MASTER_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random secret from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; MASTER_SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse a base64url (no padding) encoded secret, e.g. from environment
    /// configuration.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded.trim())?;
        let bytes: [u8; MASTER_SECRET_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("master secret must be 32 bytes".into()))?;
        Ok(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret(redacted)")
    }
}

/// Derive the AEAD key for `handle`.
///
/// HKDF-SHA256 with the master secret as IKM and the handle as salt: neither
/// a leaked handle nor a leaked database row alone is sufficient to decrypt.
pub fn credential_key(
    master: &MasterSecret,
    handle: &str,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(handle.as_bytes()), &master.0);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(CREDENTIAL_KEY_INFO, key.as_mut())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let master = MasterSecret::new([1u8; 32]);
        let k1 = credential_key(&master, "handle-a").unwrap();
        let k2 = credential_key(&master, "handle-a").unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn different_handles_yield_different_keys() {
        let master = MasterSecret::new([1u8; 32]);
        let k1 = credential_key(&master, "handle-a").unwrap();
        let k2 = credential_key(&master, "handle-b").unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn different_masters_yield_different_keys() {
        let k1 = credential_key(&MasterSecret::new([1u8; 32]), "handle").unwrap();
        let k2 = credential_key(&MasterSecret::new([2u8; 32]), "handle").unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn base64_roundtrip() {
        let master = MasterSecret::generate();
        let parsed = MasterSecret::from_base64(&master.to_base64()).unwrap();
        let k1 = credential_key(&master, "h").unwrap();
        let k2 = credential_key(&parsed, "h").unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn short_secret_rejected() {
        let encoded = URL_SAFE_NO_PAD.encode([0u8; 16]);
        assert!(matches!(
            MasterSecret::from_base64(&encoded),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_is_redacted() {
        let master = MasterSecret::new([9u8; 32]);
        assert_eq!(format!("{master:?}"), "MasterSecret(redacted)");
    }
}
