//! Messaging Module
//!
//! Data structures for the AI conversation:
//!
//! - `Conversation` - A persisted conversation
//! - `ChatMessage` - A message in the local ordered list
//! - `RemoteMessage` - A message as returned by the REST API
//!
//! # Usage
//!
//! ```rust
//! use studysync::shared::messaging::{ChatMessage, Conversation, SenderContext};
//! ```

pub mod conversation;
pub mod message;

// Re-export all types
pub use conversation::{
    Conversation, CreateConversationRequest, CreateConversationResponse,
    ListConversationsResponse,
};
pub use message::{
    ChatMessage, ChatRequest, ChatResponse, HistoryEntry, ListMessagesResponse, MessageId,
    MessageStatus, RemoteMessage, Role, SendMessageRequest, SendMessageResponse, SenderContext,
};
