//! Saved works: the gallery records that reference exported canvas images.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a stored work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(pub String);

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }
}

/// A persisted drawing plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub id: WorkId,
    pub title: String,
    pub description: String,
    /// Reference returned by the image store when the canvas was saved.
    pub image_url: String,
    pub user_id: String,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// Fields the author fills in before publishing a canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDraft {
    pub title: String,
    pub description: String,
    pub user_id: String,
}

/// Partial update to an existing work. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl WorkRecord {
    pub fn from_draft(
        id: WorkId,
        draft: WorkDraft,
        image_url: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            image_url,
            user_id: draft.user_id,
            created_at,
            updated_at: None,
        }
    }

    /// Apply a patch, stamping `updated_at`.
    pub fn apply(&mut self, patch: WorkPatch, now: Timestamp) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        self.updated_at = Some(now);
    }
}
