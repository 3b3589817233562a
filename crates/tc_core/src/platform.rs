//! Remote platform capability.
//!
//! The tracker and orchestrator consume the platform through this trait and
//! never retry or back off themselves; retryable failures are surfaced to
//! the caller. A timeout is reported as `Unavailable` and treated exactly
//! like any other failure, so an ambiguous outcome never advances state.

use async_trait::async_trait;
use thiserror::Error;

use crate::credentials::CredentialBundle;

/// Identifier of a newly created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId(pub String);

/// A post as read back from the platform.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub text: String,
}

/// The authenticated account.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("rate limited")]
    RateLimited,

    #[error("credentials rejected")]
    AuthInvalid,

    #[error("not found")]
    NotFound,

    #[error("platform unreachable: {0}")]
    Unavailable(String),

    #[error("platform error: {0}")]
    Api(String),
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Publish `text`, optionally as a reply to an existing post.
    async fn post(
        &self,
        creds: &CredentialBundle,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<PostId, PlatformError>;

    /// Fetch a single post (author and text).
    async fn get_post(&self, creds: &CredentialBundle, id: &str) -> Result<Post, PlatformError>;

    /// List reply posts within the conversation rooted at `thread_id`.
    async fn list_replies(
        &self,
        creds: &CredentialBundle,
        thread_id: &str,
    ) -> Result<Vec<Post>, PlatformError>;

    /// Fetch the authenticated account's profile.
    async fn get_profile(&self, creds: &CredentialBundle) -> Result<Profile, PlatformError>;
}
