//! Database row models — these map to/from SQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per configured session, keyed by identifier hash (uniqueness
/// enforced by the primary key).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VaultRecord {
    /// Hex SHA-256 of (session handle || server salt). Fixed 64 chars.
    pub identifier_hash: String,
    /// AEAD-encrypted credential bundle, base64.
    pub credentials_enc: String,
    /// AEAD-encrypted thread reference, base64. NULL while no thread is
    /// active.
    pub thread_ref_enc: Option<String>,
    /// Highest day already posted. 0 = nothing posted yet; the next day is
    /// always derived as `current_day + 1`, never stored.
    pub current_day: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
