//! Chat Message Data Structure
//!
//! Represents a message in an AI conversation, both as held in the local
//! ordered list and as exchanged with the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle status of a message
///
/// `Pending → Sent → Delivered`, or `Pending | Sent → Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Shown optimistically, not yet accepted by the server
    Pending,
    /// Accepted by the server, reply not yet shown
    Sent,
    /// Reply received (or loaded from the server)
    Delivered,
    /// Send failed; carries an error detail on the message
    Error,
}

/// Message identifier
///
/// Messages start with a locally generated transient id and are promoted to
/// the server's durable id once the send is acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageId {
    Transient(Uuid),
    Durable(String),
}

impl MessageId {
    /// Generate a fresh transient id
    pub fn transient() -> Self {
        MessageId::Transient(Uuid::new_v4())
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, MessageId::Durable(_))
    }

    /// Durable id as used in REST paths
    pub fn durable(&self) -> Option<&str> {
        match self {
            MessageId::Durable(id) => Some(id),
            MessageId::Transient(_) => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Transient(id) => write!(f, "local-{}", id),
            MessageId::Durable(id) => f.write_str(id),
        }
    }
}

/// Identity and display fields of a message author
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SenderContext {
    /// Stable user identifier
    pub id: String,
    /// Name shown next to the message
    pub display_name: String,
    /// Optional avatar image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl SenderContext {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Sender descriptor attached to assistant replies
    pub fn assistant() -> Self {
        Self::new("assistant", "AI Assistant")
    }
}

/// A message in the local conversation list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Transient or durable id
    pub id: MessageId,
    /// Correlation key shared by a user message and the replies it produced
    pub client_id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    pub sender: SenderContext,
    /// Human-readable failure reason when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatMessage {
    /// Optimistic user message, shown before the server has seen it
    pub fn pending_user(content: impl Into<String>, sender: SenderContext) -> Self {
        Self {
            id: MessageId::transient(),
            client_id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            status: MessageStatus::Pending,
            sender,
            error: None,
        }
    }

    /// Assistant reply paired with the user message `client_id`
    ///
    /// The reply timestamp is forced strictly after `after` so that a pair
    /// always sorts user-first, whatever clock the server used.
    pub fn assistant_reply(
        id: MessageId,
        client_id: Uuid,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        after: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            role: Role::Assistant,
            content: content.into(),
            timestamp: strictly_after(timestamp, after),
            status: MessageStatus::Delivered,
            sender: SenderContext::assistant(),
            error: None,
        }
    }

    /// Local assistant-role message recording a failed send
    pub fn error_reply(client_id: Uuid, reason: &str, after: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::transient(),
            client_id,
            role: Role::Assistant,
            content: format!("Sorry, I couldn't process your message. {}", reason),
            timestamp: strictly_after(Utc::now(), after),
            status: MessageStatus::Error,
            sender: SenderContext::assistant(),
            error: Some(reason.to_string()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        if self.content.chars().count() <= max_len {
            self.content.clone()
        } else {
            let mut preview: String = self
                .content
                .chars()
                .take(max_len.saturating_sub(3))
                .collect();
            preview.push_str("...");
            preview
        }
    }
}

fn strictly_after(candidate: DateTime<Utc>, after: DateTime<Utc>) -> DateTime<Utc> {
    if candidate > after {
        candidate
    } else {
        after + chrono::Duration::milliseconds(1)
    }
}

/// Message as returned by the REST API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Echo of the correlation key sent with the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderContext>,
}

impl RemoteMessage {
    /// Convert a loaded server message into a delivered local message
    pub fn into_chat_message(self) -> ChatMessage {
        let sender = self.sender.unwrap_or_else(|| match self.role {
            Role::Assistant => SenderContext::assistant(),
            Role::User => SenderContext::new("user", "You"),
        });
        ChatMessage {
            id: MessageId::Durable(self.id),
            client_id: self.client_id.unwrap_or_else(Uuid::new_v4),
            role: self.role,
            content: self.content,
            timestamp: self.created_at,
            status: MessageStatus::Delivered,
            sender,
            error: None,
        }
    }
}

/// Request to send a message into an existing conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub client_id: Uuid,
    pub sender: SenderContext,
}

/// Response after sending a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(default)]
    pub user_message: Option<RemoteMessage>,
    #[serde(default)]
    pub assistant_message: Option<RemoteMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One prior turn passed to the conversation-less chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Request body of the fallback chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Response of the fallback chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response for listing messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<RemoteMessage>,
}
