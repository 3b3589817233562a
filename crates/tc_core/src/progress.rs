//! Day-by-day thread progress.
//!
//! Every operation on one session is serialized through a per-hash async
//! lock, so two concurrent posts can never both claim the same day. The
//! stored day counter advances only after the platform confirms a post;
//! a remote failure (including a timeout) leaves it untouched and the
//! operation safely retryable. A post that succeeded but whose confirmation
//! was lost is reconciled manually via `set_day`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    config::{CoreConfig, MAX_POST_CHARS},
    error::Error,
    platform::{PlatformClient, Post},
    session::{SessionHandle, SessionRegistry, SessionStatus},
    thread_ref::{extract_day, normalize_thread_ref},
    vault::CredentialVault,
};
use tc_store::{ProgressFile, StoreError, VaultRecord};

/// Result of resolving a thread continuation.
#[derive(Debug, Clone)]
pub struct ThreadProgress {
    pub thread_ref: String,
    pub current_day: u32,
    pub next_day: u32,
}

/// A confirmed day post.
#[derive(Debug, Clone)]
pub struct PostedDay {
    pub post_id: String,
    pub day: u32,
    pub text: String,
}

/// Pure preview of the next post; no remote call involved.
#[derive(Debug, Clone)]
pub struct PostPreview {
    pub text: String,
    pub chars: usize,
    pub fits: bool,
    pub day: u32,
}

/// Current progress as stored.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub current_day: u32,
    pub next_day: u32,
    pub thread_ref: Option<String>,
}

pub struct ThreadProgressTracker {
    registry: SessionRegistry,
    vault: CredentialVault,
    platform: Arc<dyn PlatformClient>,
    fallback: Option<ProgressFile>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ThreadProgressTracker {
    pub fn new(
        registry: SessionRegistry,
        vault: CredentialVault,
        platform: Arc<dyn PlatformClient>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            registry,
            vault,
            platform,
            fallback: config.progress_fallback.as_ref().map(ProgressFile::new),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Post `intro` as a new root post. Discards any previous thread
    /// reference and resets the day counter to 0.
    pub async fn start_thread(
        &self,
        handle: &SessionHandle,
        intro: &str,
    ) -> Result<String, Error> {
        let hash = self.registry.identifier_hash(handle);
        let lock = self.lock_for(&hash);
        let _guard = lock.lock().await;

        self.ensure_active(handle).await?;
        validate_post_text(intro)?;

        let creds = self.vault.load(handle).await?;
        let post_id = self.platform.post(&creds, intro, None).await?;

        let sealed = self.vault.seal_ref(handle, &post_id.0)?;
        self.persist_progress(&hash, 0, Some(&sealed)).await?;
        tracing::info!(hash = %&hash[..8], "thread started");
        Ok(post_id.0)
    }

    /// Resume an existing thread from a reference (bare ID or URL).
    ///
    /// The day is computed deterministically from remote state: only replies
    /// authored by the session's own account count; the highest `Day N`
    /// marker among them wins, and if no reply carries a marker the count of
    /// own-authored replies is used. Calling this twice on an unchanged
    /// thread yields the same day.
    pub async fn continue_thread(
        &self,
        handle: &SessionHandle,
        raw_ref: &str,
    ) -> Result<ThreadProgress, Error> {
        let hash = self.registry.identifier_hash(handle);
        let lock = self.lock_for(&hash);
        let _guard = lock.lock().await;

        self.ensure_active(handle).await?;
        let thread_ref = normalize_thread_ref(raw_ref)?;

        let creds = self.vault.load(handle).await?;
        let profile = self.platform.get_profile(&creds).await?;
        let root = match self.platform.get_post(&creds, &thread_ref).await {
            Ok(root) => root,
            Err(crate::platform::PlatformError::NotFound) => {
                return Err(Error::RemoteNotFound(format!("thread {thread_ref}")))
            }
            Err(e) => return Err(e.into()),
        };
        if root.author_id != profile.id {
            return Err(Error::NotThreadOwner);
        }

        let replies = self.platform.list_replies(&creds, &thread_ref).await?;
        let current_day = resolve_day(&replies, &profile.id);

        let sealed = self.vault.seal_ref(handle, &thread_ref)?;
        self.persist_progress(&hash, i64::from(current_day), Some(&sealed))
            .await?;
        tracing::info!(hash = %&hash[..8], day = current_day, "thread resumed");
        Ok(ThreadProgress {
            thread_ref,
            current_day,
            next_day: current_day + 1,
        })
    }

    /// Post the next day into the active thread.
    ///
    /// The text is validated before any remote call; the stored day
    /// advances only after the platform confirms the post.
    pub async fn post_next(
        &self,
        handle: &SessionHandle,
        body: &str,
        link: Option<&str>,
    ) -> Result<PostedDay, Error> {
        let hash = self.registry.identifier_hash(handle);
        let lock = self.lock_for(&hash);
        let _guard = lock.lock().await;

        self.ensure_active(handle).await?;
        let record = self.load_record(&hash).await?;
        let thread_ref_enc = record.thread_ref_enc.clone().ok_or(Error::NoActiveThread)?;
        let thread_ref = self.vault.open_ref(handle, &thread_ref_enc)?;

        let day = next_day(&record)?;
        let text = compose_day_post(day, body, link);
        validate_post_text(&text)?;

        let creds = self.vault.load(handle).await?;
        let post_id = self.platform.post(&creds, &text, Some(&thread_ref)).await?;

        // Confirmed remote success; only now does the counter move.
        self.persist_progress(&hash, i64::from(day), Some(&thread_ref_enc))
            .await?;
        tracing::info!(hash = %&hash[..8], day, "day posted");
        Ok(PostedDay {
            post_id: post_id.0,
            day,
            text,
        })
    }

    /// Build the next post without touching the platform or the counter.
    pub async fn preview_next(
        &self,
        handle: &SessionHandle,
        body: &str,
        link: Option<&str>,
    ) -> Result<PostPreview, Error> {
        self.ensure_active(handle).await?;
        let hash = self.registry.identifier_hash(handle);
        let record = self.load_record(&hash).await?;
        let day = next_day(&record)?;
        let text = compose_day_post(day, body, link);
        let chars = text.chars().count();
        Ok(PostPreview {
            fits: chars <= MAX_POST_CHARS,
            chars,
            text,
            day,
        })
    }

    /// Manual override for out-of-band postings. Rejects negative days.
    pub async fn set_day(&self, handle: &SessionHandle, day: i64) -> Result<(), Error> {
        if day < 0 {
            return Err(Error::Validation(format!(
                "day must not be negative, got {day}"
            )));
        }
        let hash = self.registry.identifier_hash(handle);
        let lock = self.lock_for(&hash);
        let _guard = lock.lock().await;

        self.ensure_active(handle).await?;
        let record = self.load_record(&hash).await?;
        self.persist_progress(&hash, day, record.thread_ref_enc.as_deref())
            .await?;
        tracing::info!(hash = %&hash[..8], day, "day set manually");
        Ok(())
    }

    /// Clear progress: day 0, no thread reference. Credentials untouched.
    pub async fn reset(&self, handle: &SessionHandle) -> Result<(), Error> {
        let hash = self.registry.identifier_hash(handle);
        let lock = self.lock_for(&hash);
        let _guard = lock.lock().await;

        self.ensure_active(handle).await?;
        self.load_record(&hash).await?;
        self.persist_progress(&hash, 0, None).await?;
        tracing::info!(hash = %&hash[..8], "progress reset");
        Ok(())
    }

    /// Current progress as stored, with the thread reference decrypted.
    pub async fn progress(&self, handle: &SessionHandle) -> Result<ProgressSnapshot, Error> {
        self.ensure_active(handle).await?;
        let hash = self.registry.identifier_hash(handle);
        let record = self.load_record(&hash).await?;
        let current_day = u32::try_from(record.current_day)
            .map_err(|_| Error::Validation("stored day is out of range".into()))?;
        let thread_ref = match &record.thread_ref_enc {
            Some(enc) => Some(self.vault.open_ref(handle, enc)?),
            None => None,
        };
        Ok(ProgressSnapshot {
            current_day,
            next_day: current_day + 1,
            thread_ref,
        })
    }

    /// Drop any in-process and fallback state for a session (called on
    /// destroy).
    pub(crate) fn forget(&self, handle: &SessionHandle) {
        let hash = self.registry.identifier_hash(handle);
        if let Some(fallback) = &self.fallback {
            if let Err(e) = fallback.remove(&hash) {
                tracing::warn!(error = %e, "could not clear fallback progress entry");
            }
        }
        self.locks.lock().remove(&hash);
    }

    async fn ensure_active(&self, handle: &SessionHandle) -> Result<(), Error> {
        match self.registry.validate(handle).await? {
            SessionStatus::Valid => Ok(()),
            SessionStatus::Invalid => Err(Error::AuthExpired),
        }
    }

    async fn load_record(&self, hash: &str) -> Result<VaultRecord, Error> {
        match self.vault.store_handle().get(hash).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(Error::NoCredentials),
            Err(e) => Err(Error::StoreUnavailable(e.to_string())),
        }
    }

    /// Persist progress, degrading day counters (and only day counters) to
    /// the file fallback when the store is unreachable.
    async fn persist_progress(
        &self,
        hash: &str,
        day: i64,
        thread_ref_enc: Option<&str>,
    ) -> Result<(), Error> {
        match self
            .vault
            .store_handle()
            .save_progress(hash, day, thread_ref_enc)
            .await
        {
            Ok(()) => Ok(()),
            // No credentials row to attach progress to (destroyed mid-call).
            Err(StoreError::NotFound(_)) => Err(Error::NoCredentials),
            Err(e) => {
                if let Some(fallback) = &self.fallback {
                    fallback
                        .save_day(hash, day)
                        .map_err(|fe| Error::StoreUnavailable(fe.to_string()))?;
                    tracing::warn!(
                        hash = %&hash[..8],
                        day,
                        "store unreachable; day counter preserved in file fallback"
                    );
                    Ok(())
                } else {
                    Err(Error::StoreUnavailable(e.to_string()))
                }
            }
        }
    }

    fn lock_for(&self, hash: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(hash.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// The fixed posting template: day marker, caller body, optional link.
pub(crate) fn compose_day_post(day: u32, body: &str, link: Option<&str>) -> String {
    match link {
        Some(link) if !link.trim().is_empty() => format!("Day {day}\n\n{body}\n\n{link}"),
        _ => format!("Day {day}\n\n{body}"),
    }
}

fn validate_post_text(text: &str) -> Result<(), Error> {
    if text.trim().is_empty() {
        return Err(Error::Validation("post text cannot be empty".into()));
    }
    let chars = text.chars().count();
    if chars > MAX_POST_CHARS {
        return Err(Error::Validation(format!(
            "post is {chars} characters; the limit is {MAX_POST_CHARS}"
        )));
    }
    Ok(())
}

fn next_day(record: &VaultRecord) -> Result<u32, Error> {
    let current = u32::try_from(record.current_day)
        .map_err(|_| Error::Validation("stored day is out of range".into()))?;
    current
        .checked_add(1)
        .ok_or_else(|| Error::Validation("day counter overflow".into()))
}

/// Deterministic continuation heuristic: only own-authored replies count,
/// highest `Day N` marker wins, otherwise the plain count of own replies.
fn resolve_day(replies: &[Post], own_author_id: &str) -> u32 {
    let own: Vec<&Post> = replies
        .iter()
        .filter(|p| p.author_id == own_author_id)
        .collect();
    let best_marker = own.iter().filter_map(|p| extract_day(&p.text)).max();
    match best_marker {
        Some(day) => day,
        None => own.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(author: &str, text: &str) -> Post {
        Post {
            id: "1".into(),
            author_id: author.into(),
            text: text.into(),
        }
    }

    #[test]
    fn resolve_day_prefers_markers() {
        let replies = vec![
            post("me", "Day 3\n\nThing"),
            post("me", "Day 7\n\nOther"),
            post("someone-else", "Day 99 nice thread"),
        ];
        assert_eq!(resolve_day(&replies, "me"), 7);
    }

    #[test]
    fn resolve_day_falls_back_to_own_reply_count() {
        let replies = vec![
            post("me", "first"),
            post("me", "second"),
            post("someone-else", "Day 4"),
        ];
        assert_eq!(resolve_day(&replies, "me"), 2);
    }

    #[test]
    fn resolve_day_empty_thread_is_zero() {
        assert_eq!(resolve_day(&[], "me"), 0);
        let replies = vec![post("someone-else", "hi")];
        assert_eq!(resolve_day(&replies, "me"), 0);
    }

    #[test]
    fn compose_includes_day_body_and_link() {
        let text = compose_day_post(6, "Two Sum", Some("https://gist.github.com/x"));
        assert_eq!(text, "Day 6\n\nTwo Sum\n\nhttps://gist.github.com/x");
        let text = compose_day_post(1, "Two Sum", None);
        assert_eq!(text, "Day 1\n\nTwo Sum");
    }

    #[test]
    fn validate_rejects_empty_and_overlong() {
        assert!(validate_post_text("").is_err());
        assert!(validate_post_text("   ").is_err());
        assert!(validate_post_text(&"x".repeat(280)).is_ok());
        assert!(matches!(
            validate_post_text(&"x".repeat(281)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        // 280 multibyte characters are within the limit
        let text = "é".repeat(280);
        assert!(validate_post_text(&text).is_ok());
    }
}
