use serde::{Deserialize, Serialize};
use strand_types::{Message, MessageStatus, PaginationOpts, SortOrder};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMessagesArgs {
    pub pagination: PaginationOpts,
    /// Only these statuses; all when absent
    #[serde(default)]
    pub statuses: Option<Vec<MessageStatus>>,
    #[serde(default)]
    pub exclude_tool_messages: bool,
    #[serde(default)]
    pub order: SortOrder,
}

impl ListMessagesArgs {
    pub fn new(num_items: usize) -> Self {
        Self {
            pagination: PaginationOpts::first(num_items),
            ..Default::default()
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.pagination.cursor = Some(cursor.into());
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<MessageStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn without_tool_messages(mut self) -> Self {
        self.exclude_tool_messages = true;
        self
    }

    pub fn ascending(mut self) -> Self {
        self.order = SortOrder::Asc;
        self
    }
}

/// Terminal transition for a pending message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeMessage {
    pub status: MessageStatus,
    /// Replacement content
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FinalizeMessage {
    pub fn success(message: Option<Message>) -> Self {
        Self {
            status: MessageStatus::Success,
            message,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Failed,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateThreadArgs {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}
