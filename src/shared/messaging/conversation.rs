//! Conversation Data Structure
//!
//! Represents an AI conversation owned by the active chat view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a persisted AI conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Server-assigned conversation ID
    pub id: String,
    /// Title shown in the conversation list
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Preview of the last message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

impl Conversation {
    /// Record the latest message preview and bump `updated_at`
    pub fn touch(&mut self, preview: String, at: DateTime<Utc>) {
        self.last_message = Some(preview);
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

/// Response for listing conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<Conversation>,
}

/// Request to create a conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional first message used by the server to seed the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

impl CreateConversationRequest {
    /// Build a request seeded with the first message; the title is derived from it
    pub fn seeded(seed: Option<&str>) -> Self {
        Self {
            title: seed.map(derive_title),
            initial_message: seed.map(str::to_string),
        }
    }

    /// Build a request that only names the conversation after `first_message`
    ///
    /// Used when the first message is sent separately right after creation.
    pub fn titled(first_message: &str) -> Self {
        Self {
            title: Some(derive_title(first_message)),
            initial_message: None,
        }
    }
}

/// Response after creating a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationResponse {
    pub success: bool,
    #[serde(default)]
    pub conversation: Option<Conversation>,
    #[serde(default)]
    pub error: Option<String>,
}

const TITLE_LEN: usize = 50;

fn derive_title(seed: &str) -> String {
    let trimmed = seed.trim();
    if trimmed.chars().count() <= TITLE_LEN {
        trimmed.to_string()
    } else {
        let mut title: String = trimmed.chars().take(TITLE_LEN).collect();
        title.push_str("...");
        title
    }
}
