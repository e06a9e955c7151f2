use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
        }
    }
}

/// Cached result of one successful generation. Immutable once written; a
/// read past `expires_at` counts as a miss and the entry is overwritten by
/// the next generation for the same key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub artifact_ref: String,
    pub kind: ArtifactKind,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// One completed generation event in a user's bounded history list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: ArtifactKind,
    pub input_ref: String,
    pub artifact_ref: String,
    pub params: Value,
    pub created_at: DateTime<Utc>,
}
