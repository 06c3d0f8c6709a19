//! # Transport Gateway
//!
//! Thin wrappers around the network. The gateway issues authenticated REST
//! calls and keeps the push channel connected; it holds no business state.
//!
//! The two controllers talk to it through the [`ChatApi`] and
//! [`NotificationApi`] traits so that tests can substitute in-memory fakes.
//!
//! - `http.rs`: reqwest implementation of both traits
//! - `push.rs`: server-sent event push channel with reconnection
//! - `backoff.rs`: reconnect delay policy

pub mod backoff;
pub mod http;
pub mod push;

pub use backoff::{Backoff, BackoffStrategy};
pub use http::HttpGateway;
pub use push::{PushChannel, PushStatus, SseDecoder, SseFrame};

use crate::client::error::ClientResult;
use crate::shared::messaging::{
    ChatRequest, Conversation, CreateConversationRequest, RemoteMessage, SendMessageRequest,
};
use crate::shared::notification::{ListNotificationsResponse, NotificationSettings};
use async_trait::async_trait;

/// Normalized result of a successful message send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExchange {
    /// Server echo of the user message, carrying its durable id
    pub user_message: Option<RemoteMessage>,
    /// Assistant reply
    pub reply: RemoteMessage,
}

/// REST operations used by the conversation controller
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /ai/conversations`
    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> ClientResult<Conversation>;

    /// `GET /ai/conversations`
    async fn list_conversations(&self) -> ClientResult<Vec<Conversation>>;

    /// `GET /ai/conversations/{id}/messages`
    async fn list_messages(&self, conversation_id: &str) -> ClientResult<Vec<RemoteMessage>>;

    /// `POST /ai/conversations/{id}/messages`
    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> ClientResult<MessageExchange>;

    /// `POST /ai/chat`, the conversation-less fallback; returns the reply text
    async fn chat(&self, request: &ChatRequest) -> ClientResult<String>;

    /// `DELETE /ai/conversations/{id}/messages/{msgId}`
    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> ClientResult<()>;
}

/// REST operations used by the notification service
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET /notifications`
    async fn list_notifications(&self) -> ClientResult<ListNotificationsResponse>;

    /// `GET /notifications/unread-count`
    async fn unread_count(&self) -> ClientResult<u32>;

    /// `PUT /notifications/{id}/read`
    async fn mark_read(&self, id: &str) -> ClientResult<()>;

    /// `PUT /notifications/mark-all-read`
    async fn mark_all_read(&self) -> ClientResult<()>;

    /// `DELETE /notifications/{id}`
    async fn delete_notification(&self, id: &str) -> ClientResult<()>;

    /// `GET /notifications/settings`
    async fn get_settings(&self) -> ClientResult<NotificationSettings>;

    /// `PUT /notifications/settings`
    async fn update_settings(&self, settings: &NotificationSettings) -> ClientResult<()>;
}
