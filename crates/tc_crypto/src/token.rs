//! Session handles and identifier hashing.
//!
//! Handles are opaque bearer tokens held by the caller; only their one-way
//! hash (mixed with a server-side salt) ever reaches persistent storage.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Raw entropy per handle, in bytes (256 bits).
pub const HANDLE_ENTROPY_LEN: usize = 32;

/// Hex length of an identifier hash (SHA-256).
pub const IDENTIFIER_HASH_LEN: usize = 64;

/// Generate a fresh session handle: 32 CSPRNG bytes, base64url no-pad.
pub fn generate_handle() -> String {
    let mut bytes = [0u8; HANDLE_ENTROPY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// One-way digest used as the storage key: hex(SHA-256(handle || salt)),
/// fixed 64 characters.
pub fn identifier_hash(handle: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(handle.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_urlsafe() {
        let h1 = generate_handle();
        let h2 = generate_handle();
        assert_ne!(h1, h2);
        // 32 bytes -> 43 base64url chars, no padding
        assert_eq!(h1.len(), 43);
        assert!(h1
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn identifier_hash_is_fixed_hex() {
        let hash = identifier_hash("some-handle", "salt");
        assert_eq!(hash.len(), IDENTIFIER_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identifier_hash_is_deterministic() {
        assert_eq!(
            identifier_hash("handle", "salt"),
            identifier_hash("handle", "salt")
        );
    }

    #[test]
    fn salt_changes_the_hash() {
        assert_ne!(
            identifier_hash("handle", "salt-1"),
            identifier_hash("handle", "salt-2")
        );
    }

    #[test]
    fn handle_changes_the_hash() {
        assert_ne!(
            identifier_hash("handle-1", "salt"),
            identifier_hash("handle-2", "salt")
        );
    }
}
