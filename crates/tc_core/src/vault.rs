//! Encrypted credential persistence.
//!
//! Bundles are serialized, AEAD-encrypted under the per-session key, and
//! upserted keyed by identifier hash. "No record" and "record that will not
//! decrypt" are distinct failures: the first means credentials were never
//! stored (or were destroyed), the second that the handle no longer matches
//! what encrypted the blob (tampering, or a rotated master secret).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use zeroize::Zeroizing;

use crate::{
    config::CoreConfig, credentials::CredentialBundle, error::Error, session::SessionHandle,
};
use tc_crypto::{aead, kdf};
use tc_store::Store;

#[derive(Clone)]
pub struct CredentialVault {
    store: Store,
    config: CoreConfig,
}

impl CredentialVault {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    fn identifier_hash(&self, handle: &SessionHandle) -> String {
        tc_crypto::token::identifier_hash(handle.as_str(), &self.config.server_salt)
    }

    /// Encrypt and upsert a bundle. Reconnecting with the same session
    /// overwrites credentials but preserves thread progress.
    pub async fn store(
        &self,
        handle: &SessionHandle,
        bundle: &CredentialBundle,
    ) -> Result<(), Error> {
        bundle.validate()?;
        let key = kdf::credential_key(&self.config.master_secret, handle.as_str())?;
        let plaintext = Zeroizing::new(
            serde_json::to_vec(bundle).map_err(|e| Error::Crypto(e.to_string()))?,
        );
        let blob = aead::encrypt(&key, &plaintext, aead::CREDENTIALS_AAD)?;
        let hash = self.identifier_hash(handle);
        self.store
            .upsert_credentials(&hash, &URL_SAFE_NO_PAD.encode(blob))
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Decrypt the stored bundle for a handle.
    pub async fn load(&self, handle: &SessionHandle) -> Result<CredentialBundle, Error> {
        let hash = self.identifier_hash(handle);
        let record = match self.store.get(&hash).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(Error::NoCredentials),
            Err(e) => return Err(Error::StoreUnavailable(e.to_string())),
        };

        let blob = URL_SAFE_NO_PAD.decode(&record.credentials_enc).map_err(|e| {
            tracing::warn!(hash = %&hash[..8], error = %e, "stored credential blob is not valid base64");
            Error::DecryptionFailed
        })?;
        let key = kdf::credential_key(&self.config.master_secret, handle.as_str())?;
        let plaintext = aead::decrypt(&key, &blob, aead::CREDENTIALS_AAD).map_err(|e| {
            tracing::warn!(hash = %&hash[..8], error = %e, "credential decryption failed");
            Error::from(e)
        })?;
        serde_json::from_slice(&plaintext).map_err(|_| {
            tracing::warn!(hash = %&hash[..8], "decrypted credential blob did not parse");
            Error::DecryptionFailed
        })
    }

    /// Remove the record for a handle. Idempotent.
    pub async fn remove(&self, handle: &SessionHandle) -> Result<(), Error> {
        let hash = self.identifier_hash(handle);
        self.store
            .delete(&hash)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Encrypt a thread reference for storage alongside the credentials.
    pub(crate) fn seal_ref(
        &self,
        handle: &SessionHandle,
        thread_ref: &str,
    ) -> Result<String, Error> {
        let key = kdf::credential_key(&self.config.master_secret, handle.as_str())?;
        let blob = aead::encrypt(&key, thread_ref.as_bytes(), aead::THREAD_REF_AAD)?;
        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Decrypt a stored thread reference.
    pub(crate) fn open_ref(
        &self,
        handle: &SessionHandle,
        thread_ref_enc: &str,
    ) -> Result<String, Error> {
        let blob = URL_SAFE_NO_PAD
            .decode(thread_ref_enc)
            .map_err(|_| Error::DecryptionFailed)?;
        let key = kdf::credential_key(&self.config.master_secret, handle.as_str())?;
        let plaintext = aead::decrypt(&key, &blob, aead::THREAD_REF_AAD)?;
        String::from_utf8(plaintext.to_vec()).map_err(|_| Error::DecryptionFailed)
    }

    pub(crate) fn store_handle(&self) -> &Store {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_crypto::kdf::MasterSecret;

    fn bundle() -> CredentialBundle {
        CredentialBundle {
            api_key: "ck".into(),
            api_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "ats".into(),
            bearer_token: "bt".into(),
        }
    }

    async fn vault() -> CredentialVault {
        let store = Store::in_memory().await.unwrap();
        let config = CoreConfig::new(MasterSecret::new([3u8; 32]), "salt");
        CredentialVault::new(store, config)
    }

    fn handle() -> SessionHandle {
        SessionHandle::new(tc_crypto::token::generate_handle())
    }

    #[tokio::test]
    async fn store_then_load_roundtrip() {
        let vault = vault().await;
        let handle = handle();
        vault.store(&handle, &bundle()).await.unwrap();
        let loaded = vault.load(&handle).await.unwrap();
        assert_eq!(loaded, bundle());
    }

    #[tokio::test]
    async fn load_without_store_is_no_credentials() {
        let vault = vault().await;
        assert!(matches!(
            vault.load(&handle()).await,
            Err(Error::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn wrong_handle_fails_decryption_not_lookup() {
        let vault = vault().await;
        let handle_a = handle();
        vault.store(&handle_a, &bundle()).await.unwrap();

        // A different handle hashes to a different row: lookup miss.
        assert!(matches!(
            vault.load(&handle()).await,
            Err(Error::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn tampered_blob_is_decryption_failure() {
        let vault = vault().await;
        let handle = handle();
        vault.store(&handle, &bundle()).await.unwrap();

        let hash =
            tc_crypto::token::identifier_hash(handle.as_str(), &vault.config.server_salt);
        let record = vault.store.get(&hash).await.unwrap().unwrap();
        let mut corrupted = record.credentials_enc.clone();
        // flip the final character to break the tag
        let replacement = if corrupted.ends_with('A') { 'B' } else { 'A' };
        corrupted.pop();
        corrupted.push(replacement);
        vault
            .store
            .upsert_credentials(&hash, &corrupted)
            .await
            .unwrap();

        assert!(matches!(
            vault.load(&handle).await,
            Err(Error::DecryptionFailed)
        ));
    }

    #[tokio::test]
    async fn master_secret_rotation_fails_decryption() {
        let store = Store::in_memory().await.unwrap();
        let handle = handle();

        let vault =
            CredentialVault::new(store.clone(), CoreConfig::new(MasterSecret::new([3u8; 32]), "salt"));
        vault.store(&handle, &bundle()).await.unwrap();

        let rotated =
            CredentialVault::new(store, CoreConfig::new(MasterSecret::new([4u8; 32]), "salt"));
        assert!(matches!(
            rotated.load(&handle).await,
            Err(Error::DecryptionFailed)
        ));
    }

    #[tokio::test]
    async fn seal_and_open_ref_roundtrip() {
        let vault = vault().await;
        let handle = handle();
        let sealed = vault.seal_ref(&handle, "1234567890").unwrap();
        assert_ne!(sealed, "1234567890");
        assert_eq!(vault.open_ref(&handle, &sealed).unwrap(), "1234567890");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let vault = vault().await;
        let handle = handle();
        vault.store(&handle, &bundle()).await.unwrap();
        vault.remove(&handle).await.unwrap();
        vault.remove(&handle).await.unwrap();
        assert!(matches!(
            vault.load(&handle).await,
            Err(Error::NoCredentials)
        ));
    }
}
