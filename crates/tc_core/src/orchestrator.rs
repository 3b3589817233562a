//! Thin coordination layer.
//!
//! Binds the session registry, credential vault, and progress tracker to
//! the remote platform capability. Connecting verifies the submitted
//! credentials against the platform before the session is treated as
//! trustworthy; a failed verification destroys the just-created session
//! rather than leaving an invalid one active.

use std::sync::Arc;

use crate::{
    config::CoreConfig,
    credentials::CredentialBundle,
    error::Error,
    platform::{PlatformClient, Profile},
    progress::{PostPreview, PostedDay, ProgressSnapshot, ThreadProgress, ThreadProgressTracker},
    session::{SessionHandle, SessionRegistry, SessionStatus},
    vault::CredentialVault,
};
use tc_store::Store;

pub struct Orchestrator {
    registry: SessionRegistry,
    vault: CredentialVault,
    tracker: ThreadProgressTracker,
    platform: Arc<dyn PlatformClient>,
}

impl Orchestrator {
    pub fn new(store: Store, platform: Arc<dyn PlatformClient>, config: CoreConfig) -> Self {
        let registry = SessionRegistry::new(store.clone(), config.clone());
        let vault = CredentialVault::new(store, config.clone());
        let tracker = ThreadProgressTracker::new(
            registry.clone(),
            vault.clone(),
            platform.clone(),
            &config,
        );
        Self {
            registry,
            vault,
            tracker,
            platform,
        }
    }

    /// Submit credentials, mint a session, and verify against the platform.
    ///
    /// Verification failure (bad keys, platform down) destroys the session:
    /// an unverified handle never stays active.
    pub async fn connect(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<(SessionHandle, Profile), Error> {
        let handle = self.registry.mint(bundle)?;
        self.vault.store(&handle, bundle).await?;

        match self.platform.get_profile(bundle).await {
            Ok(profile) => {
                tracing::info!(username = %profile.username, "session connected");
                Ok((handle, profile))
            }
            Err(e) => {
                tracing::warn!(error = %e, "credential verification failed; destroying session");
                let _ = self.registry.destroy(&handle).await;
                Err(e.into())
            }
        }
    }

    /// Replace the credentials bound to an existing session. Thread
    /// progress is untouched; the new bundle is verified before it is
    /// stored.
    pub async fn update_credentials(
        &self,
        handle: &SessionHandle,
        bundle: &CredentialBundle,
    ) -> Result<Profile, Error> {
        self.ensure_active(handle).await?;
        bundle.validate()?;
        let profile = self.platform.get_profile(bundle).await?;
        self.vault.store(handle, bundle).await?;
        tracing::info!(username = %profile.username, "session credentials updated");
        Ok(profile)
    }

    /// End a session and remove all its vault data. Idempotent.
    pub async fn disconnect(&self, handle: &SessionHandle) -> Result<(), Error> {
        self.tracker.forget(handle);
        self.registry.destroy(handle).await
    }

    /// Check whether a handle is still active.
    pub async fn session_status(&self, handle: &SessionHandle) -> Result<SessionStatus, Error> {
        self.registry.validate(handle).await
    }

    /// The authenticated account's profile, fetched with the session's
    /// stored credentials.
    pub async fn profile(&self, handle: &SessionHandle) -> Result<Profile, Error> {
        self.ensure_active(handle).await?;
        let creds = self.vault.load(handle).await?;
        Ok(self.platform.get_profile(&creds).await?)
    }

    pub async fn progress(&self, handle: &SessionHandle) -> Result<ProgressSnapshot, Error> {
        self.tracker.progress(handle).await
    }

    pub async fn start_thread(&self, handle: &SessionHandle, intro: &str) -> Result<String, Error> {
        self.tracker.start_thread(handle, intro).await
    }

    pub async fn continue_thread(
        &self,
        handle: &SessionHandle,
        raw_ref: &str,
    ) -> Result<ThreadProgress, Error> {
        self.tracker.continue_thread(handle, raw_ref).await
    }

    pub async fn post_next(
        &self,
        handle: &SessionHandle,
        body: &str,
        link: Option<&str>,
    ) -> Result<PostedDay, Error> {
        self.tracker.post_next(handle, body, link).await
    }

    pub async fn preview_next(
        &self,
        handle: &SessionHandle,
        body: &str,
        link: Option<&str>,
    ) -> Result<PostPreview, Error> {
        self.tracker.preview_next(handle, body, link).await
    }

    pub async fn set_day(&self, handle: &SessionHandle, day: i64) -> Result<(), Error> {
        self.tracker.set_day(handle, day).await
    }

    pub async fn reset(&self, handle: &SessionHandle) -> Result<(), Error> {
        self.tracker.reset(handle).await
    }

    async fn ensure_active(&self, handle: &SessionHandle) -> Result<(), Error> {
        match self.registry.validate(handle).await? {
            SessionStatus::Valid => Ok(()),
            SessionStatus::Invalid => Err(Error::AuthExpired),
        }
    }
}
