//! Authenticated encryption for vault blobs.
//!
//! Uses XChaCha20-Poly1305 (192-bit nonce).
//! Key size: 32 bytes.  Nonce: 24 bytes (random).  Tag: 16 bytes.
//!
//! Ciphertext wire format:
//!   [ nonce (24 bytes) | ciphertext + tag ]
//!
//! Decryption fails closed: tampered or truncated input is rejected by the
//! Poly1305 tag check and never yields partial plaintext.

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;

pub const NONCE_LEN: usize = 24;

/// AAD for encrypted credential bundles.
pub const CREDENTIALS_AAD: &[u8] = b"tc-credentials-v1";
/// AAD for encrypted thread references.
pub const THREAD_REF_AAD: &[u8] = b"tc-thread-ref-v1";

/// Encrypt `plaintext` with a 32-byte key, prepending a random 24-byte nonce.
/// `aad` — additional associated data (authenticated but not encrypted),
/// used here for domain separation between blob kinds.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::AeadEncrypt)?;

    let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            chacha20poly1305::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadEncrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt wire-format bytes (nonce || ciphertext+tag).
pub fn decrypt(key: &[u8; 32], data: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if data.len() < NONCE_LEN {
        return Err(CryptoError::AeadDecrypt);
    }
    let (nonce_bytes, ct) = data.split_at(NONCE_LEN);
    let nonce = chacha20poly1305::XNonce::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::AeadDecrypt)?;

    let plaintext = cipher
        .decrypt(nonce, chacha20poly1305::aead::Payload { msg: ct, aad })
        .map_err(|_| CryptoError::AeadDecrypt)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        [7u8; 32]
    }

    #[test]
    fn roundtrip_preserves_plaintext() {
        let msg = b"five opaque credential strings";
        let ct = encrypt(&key(), msg, CREDENTIALS_AAD).unwrap();
        let pt = decrypt(&key(), &ct, CREDENTIALS_AAD).unwrap();
        assert_eq!(pt.as_slice(), msg);
    }

    #[test]
    fn roundtrip_empty_and_large() {
        for len in [0usize, 1, 280, 10_000] {
            let msg = vec![0xabu8; len];
            let ct = encrypt(&key(), &msg, THREAD_REF_AAD).unwrap();
            let pt = decrypt(&key(), &ct, THREAD_REF_AAD).unwrap();
            assert_eq!(pt.as_slice(), msg.as_slice(), "len={len}");
        }
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let ct1 = encrypt(&key(), b"same", CREDENTIALS_AAD).unwrap();
        let ct2 = encrypt(&key(), b"same", CREDENTIALS_AAD).unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let mut ct = encrypt(&key(), b"sensitive", CREDENTIALS_AAD).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xff;
        assert!(matches!(
            decrypt(&key(), &ct, CREDENTIALS_AAD),
            Err(CryptoError::AeadDecrypt)
        ));
    }

    #[test]
    fn truncated_ciphertext_rejected() {
        let ct = encrypt(&key(), b"sensitive", CREDENTIALS_AAD).unwrap();
        assert!(decrypt(&key(), &ct[..NONCE_LEN + 4], CREDENTIALS_AAD).is_err());
        assert!(decrypt(&key(), &ct[..8], CREDENTIALS_AAD).is_err());
    }

    #[test]
    fn wrong_key_rejected() {
        let ct = encrypt(&key(), b"sensitive", CREDENTIALS_AAD).unwrap();
        let other = [8u8; 32];
        assert!(decrypt(&other, &ct, CREDENTIALS_AAD).is_err());
    }

    #[test]
    fn wrong_aad_rejected() {
        let ct = encrypt(&key(), b"sensitive", CREDENTIALS_AAD).unwrap();
        assert!(decrypt(&key(), &ct, THREAD_REF_AAD).is_err());
    }
}
