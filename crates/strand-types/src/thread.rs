use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Active,
    Archived,
}

/// Ordered conversation container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(user_id: Option<String>, title: Option<String>, summary: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            title,
            summary,
            status: ThreadStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update; absent fields are left untouched.
    pub fn apply(&mut self, patch: ThreadPatch) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(summary) = patch.summary {
            self.summary = Some(summary);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_patch_keeps_missing_fields() {
        let mut thread = Thread::new(Some("u1".to_string()), Some("Title".to_string()), None);
        thread.apply(ThreadPatch {
            summary: Some("short".to_string()),
            ..Default::default()
        });
        assert_eq!(thread.title.as_deref(), Some("Title"));
        assert_eq!(thread.summary.as_deref(), Some("short"));
        assert_eq!(thread.status, ThreadStatus::Active);
    }
}
