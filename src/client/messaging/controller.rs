//! Conversation Controller
//!
//! Owns the ordered message list of the active AI conversation and drives
//! every message through `Pending → Sent → Delivered` (or `Error`).
//!
//! ## Send lifecycle
//!
//! 1. The user message is appended as `Pending` before any network call.
//! 2. A conversation is bootstrapped if the view has none yet.
//! 3. `POST /ai/conversations/{id}/messages`; on failure the same content
//!    goes to `POST /ai/chat` before any error is reported.
//! 4. The user message is promoted to its durable id and marked `Sent`.
//! 5. After the typing pause the reply is appended and the user message
//!    becomes `Delivered`.
//!
//! Every resume point re-checks the send token. A cancelled or superseded
//! send never appends anything.

use super::pacing::TypingPace;
use crate::client::error::{ClientError, ClientResult};
use crate::client::gateway::{ChatApi, MessageExchange};
use crate::client::sync::{promote, RequestToken, TokenSlot};
use crate::shared::config::AppConfig;
use crate::shared::messaging::{
    ChatMessage, ChatRequest, Conversation, CreateConversationRequest, HistoryEntry, MessageId,
    MessageStatus, Role, SendMessageRequest, SenderContext,
};
use crate::shared::SharedError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Prior turns passed along to the fallback endpoint
const FALLBACK_HISTORY: usize = 20;

/// Length of the conversation's last-message preview
const PREVIEW_LEN: usize = 100;

/// How a send finished when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was appended
    Delivered(ChatMessage),
    /// The send was cancelled or superseded; nothing was appended
    Cancelled,
}

/// How a load finished when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The snapshot replaced local state; carries the message count
    Applied(usize),
    /// A newer load, a send or a cancel took over; the result was dropped
    Superseded,
}

#[derive(Debug, Default)]
struct ConversationState {
    conversation_id: Option<String>,
    conversation: Option<Conversation>,
    /// Conversations seen through `list_conversations`
    known: Vec<Conversation>,
    messages: Vec<ChatMessage>,
    send_slot: TokenSlot,
    load_slot: TokenSlot,
    /// Correlation key of the user message of the running send
    active_send: Option<Uuid>,
}

impl ConversationState {
    /// Record a freshly created conversation unless one was adopted meanwhile
    fn adopt(&mut self, conversation: Conversation) -> String {
        if let Some(existing) = &self.conversation_id {
            tracing::warn!(
                "[CHAT] conversation {} created but {} is already active",
                conversation.id,
                existing
            );
            return existing.clone();
        }
        let id = conversation.id.clone();
        self.conversation_id = Some(id.clone());
        self.conversation = Some(conversation);
        id
    }

    fn user_message_mut(&mut self, client_id: Uuid) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|msg| msg.is_user() && msg.client_id == client_id)
    }

    fn history(&self) -> Vec<HistoryEntry> {
        let settled: Vec<&ChatMessage> = self
            .messages
            .iter()
            .filter(|msg| matches!(msg.status, MessageStatus::Sent | MessageStatus::Delivered))
            .collect();
        settled[settled.len().saturating_sub(FALLBACK_HISTORY)..]
            .iter()
            .map(|msg| HistoryEntry {
                role: msg.role,
                content: msg.content.clone(),
            })
            .collect()
    }

    fn finish_send(&mut self, token: &RequestToken) {
        self.send_slot.release(token);
        self.active_send = None;
    }
}

/// Everything a running send needs once the state lock is released
#[derive(Debug)]
struct PendingSend {
    token: RequestToken,
    client_id: Uuid,
    content: String,
    sender: SenderContext,
    timestamp: DateTime<Utc>,
    conversation_id: Option<String>,
    history: Vec<HistoryEntry>,
}

/// Normalized reply from either endpoint
#[derive(Debug)]
struct Reply {
    user_id: Option<String>,
    id: MessageId,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<MessageExchange> for Reply {
    fn from(exchange: MessageExchange) -> Self {
        Self {
            user_id: exchange.user_message.map(|msg| msg.id),
            id: MessageId::Durable(exchange.reply.id),
            content: exchange.reply.content,
            created_at: exchange.reply.created_at,
        }
    }
}

/// Message lifecycle controller for one conversation view
pub struct ConversationController {
    api: Arc<dyn ChatApi>,
    pace: TypingPace,
    state: RwLock<ConversationState>,
}

impl ConversationController {
    pub fn new(api: Arc<dyn ChatApi>, config: &AppConfig) -> Self {
        Self::with_pace(api, TypingPace::from_config(config))
    }

    pub fn with_pace(api: Arc<dyn ChatApi>, pace: TypingPace) -> Self {
        Self {
            api,
            pace,
            state: RwLock::new(ConversationState::default()),
        }
    }

    // ========== Accessors ==========

    /// Snapshot of the ordered message list
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    pub async fn conversation(&self) -> Option<Conversation> {
        self.state.read().await.conversation.clone()
    }

    pub async fn conversation_id(&self) -> Option<String> {
        self.state.read().await.conversation_id.clone()
    }

    /// Whether a send is in flight
    pub async fn is_busy(&self) -> bool {
        self.state.read().await.send_slot.is_active()
    }

    // ========== Sending ==========

    /// Send `content` as `sender` and wait for the reply
    pub async fn send_message(
        &self,
        content: &str,
        sender: SenderContext,
    ) -> ClientResult<SendOutcome> {
        if content.trim().is_empty() {
            return Err(SharedError::validation("content", "Message cannot be empty").into());
        }
        let pending = {
            let mut state = self.state.write().await;
            self.begin_send(&mut state, content.to_string(), sender)?
        };
        self.drive_send(pending).await
    }

    /// Re-send a failed user message with identical content and sender
    ///
    /// The failed message and its error reply are replaced by a fresh
    /// pending message at the end of the list.
    pub async fn retry_message(&self, id: &MessageId) -> ClientResult<SendOutcome> {
        let pending = {
            let mut state = self.state.write().await;
            let pos = state
                .messages
                .iter()
                .position(|msg| &msg.id == id)
                .ok_or_else(|| ClientError::NotFound("message".to_string()))?;
            let target = &state.messages[pos];
            if !target.is_user() || target.status != MessageStatus::Error {
                return Err(ClientError::InvalidRetry(format!(
                    "message {} is not a failed user message",
                    id
                )));
            }
            if state.send_slot.is_active() {
                return Err(ClientError::Busy);
            }
            let failed = state.messages.remove(pos);
            state.messages.retain(|msg| {
                !(msg.client_id == failed.client_id
                    && msg.role == Role::Assistant
                    && msg.status == MessageStatus::Error)
            });
            tracing::info!("[CHAT] retrying message {}", id);
            self.begin_send(&mut state, failed.content, failed.sender)?
        };
        self.drive_send(pending).await
    }

    /// Cancel the running send and any in-flight load
    ///
    /// A still-pending user message is withdrawn; one the server already
    /// accepted stays but never receives a reply. Returns whether anything
    /// was cancelled.
    pub async fn cancel_active_request(&self) -> bool {
        let mut state = self.state.write().await;
        let load_cancelled = state.load_slot.invalidate().is_some();
        let send_cancelled = state.send_slot.invalidate().is_some();
        if let Some(client_id) = state.active_send.take() {
            let before = state.messages.len();
            state.messages.retain(|msg| {
                !(msg.is_user() && msg.client_id == client_id && msg.status == MessageStatus::Pending)
            });
            tracing::info!(
                "[CHAT] send cancelled ({} pending message withdrawn)",
                before - state.messages.len()
            );
        }
        send_cancelled || load_cancelled
    }

    fn begin_send(
        &self,
        state: &mut ConversationState,
        content: String,
        sender: SenderContext,
    ) -> ClientResult<PendingSend> {
        if state.send_slot.is_active() {
            tracing::debug!("[CHAT] send rejected, another send is pending");
            return Err(ClientError::Busy);
        }
        let token = state.send_slot.issue();
        if state.load_slot.invalidate().is_some() {
            tracing::debug!("[CHAT] in-flight load superseded by send");
        }

        let history = state.history();
        let message = ChatMessage::pending_user(content, sender);
        let pending = PendingSend {
            token,
            client_id: message.client_id,
            content: message.content.clone(),
            sender: message.sender.clone(),
            timestamp: message.timestamp,
            conversation_id: state.conversation_id.clone(),
            history,
        };
        state.active_send = Some(message.client_id);
        state.messages.push(message);
        tracing::info!("[CHAT] message {} pending", pending.client_id);
        Ok(pending)
    }

    async fn drive_send(&self, pending: PendingSend) -> ClientResult<SendOutcome> {
        let token = pending.token.clone();

        let result = tokio::select! {
            _ = token.cancelled() => return Ok(SendOutcome::Cancelled),
            result = self.exchange(&pending) => result,
        };
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => return self.fail_send(&pending, err).await,
        };

        {
            let mut state = self.state.write().await;
            if !state.send_slot.is_current(&token) {
                tracing::warn!("[CHAT] discarding response of superseded send #{}", token.id());
                return Ok(SendOutcome::Cancelled);
            }
            if let Some(durable) = &reply.user_id {
                promote(&mut state.messages, pending.client_id, durable.clone());
            }
            if let Some(msg) = state.user_message_mut(pending.client_id) {
                msg.status = MessageStatus::Sent;
            }
        }
        tracing::info!("[CHAT] message {} sent", pending.client_id);

        let delay = self.pace.delay_for(&reply.content);
        tokio::select! {
            _ = token.cancelled() => return Ok(SendOutcome::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        let mut state = self.state.write().await;
        if !state.send_slot.is_current(&token) {
            tracing::warn!("[CHAT] discarding reply of superseded send #{}", token.id());
            return Ok(SendOutcome::Cancelled);
        }
        let reply = ChatMessage::assistant_reply(
            reply.id,
            pending.client_id,
            reply.content,
            reply.created_at,
            pending.timestamp,
        );
        if let Some(msg) = state.user_message_mut(pending.client_id) {
            msg.status = MessageStatus::Delivered;
        }
        state.messages.push(reply.clone());
        if let Some(conversation) = state.conversation.as_mut() {
            conversation.touch(reply.preview(PREVIEW_LEN), reply.timestamp);
        }
        state.finish_send(&token);
        tracing::info!("[CHAT] reply to {} delivered", pending.client_id);
        Ok(SendOutcome::Delivered(reply))
    }

    /// Primary endpoint, then the conversation-less fallback
    async fn exchange(&self, pending: &PendingSend) -> ClientResult<Reply> {
        let conversation_id = match &pending.conversation_id {
            Some(id) => id.clone(),
            None => self.bootstrap(pending).await?,
        };

        let request = SendMessageRequest {
            content: pending.content.clone(),
            client_id: pending.client_id,
            sender: pending.sender.clone(),
        };
        let primary = match self.api.send_message(&conversation_id, &request).await {
            Ok(exchange) => return Ok(exchange.into()),
            Err(err) => err,
        };

        tracing::warn!("[CHAT] primary send failed ({}), trying /ai/chat", primary);
        let fallback = ChatRequest {
            message: pending.content.clone(),
            history: pending.history.clone(),
        };
        match self.api.chat(&fallback).await {
            Ok(content) => Ok(Reply {
                user_id: None,
                id: MessageId::transient(),
                content,
                created_at: Utc::now(),
            }),
            Err(err) => {
                tracing::error!("[CHAT] fallback send failed: {}", err);
                Err(err)
            }
        }
    }

    async fn bootstrap(&self, pending: &PendingSend) -> ClientResult<String> {
        tracing::info!("[CHAT] no active conversation, creating one");
        let request = CreateConversationRequest::titled(&pending.content);
        let conversation = self
            .api
            .create_conversation(&request)
            .await
            .map_err(|e| ClientError::ConversationCreationFailed(e.to_string()))?;

        let mut state = self.state.write().await;
        if !state.send_slot.is_current(&pending.token) {
            return Ok(conversation.id);
        }
        Ok(state.adopt(conversation))
    }

    async fn fail_send(&self, pending: &PendingSend, err: ClientError) -> ClientResult<SendOutcome> {
        let mut state = self.state.write().await;
        if !state.send_slot.is_current(&pending.token) {
            tracing::warn!(
                "[CHAT] discarding failure of superseded send #{}: {}",
                pending.token.id(),
                err
            );
            return Ok(SendOutcome::Cancelled);
        }
        let reason = err.user_message();
        tracing::error!("[CHAT] message {} failed: {}", pending.client_id, err);
        if let Some(msg) = state.user_message_mut(pending.client_id) {
            msg.status = MessageStatus::Error;
            msg.error = Some(reason.clone());
        }
        state
            .messages
            .push(ChatMessage::error_reply(pending.client_id, &reason, pending.timestamp));
        state.finish_send(&pending.token);
        Err(err)
    }

    // ========== Conversations ==========

    /// Return the active conversation id, creating a conversation if needed
    pub async fn create_conversation(&self, seed: Option<&str>) -> ClientResult<String> {
        if let Some(id) = self.conversation_id().await {
            return Ok(id);
        }
        let conversation = self
            .api
            .create_conversation(&CreateConversationRequest::seeded(seed))
            .await
            .map_err(|e| {
                tracing::error!("[CHAT] conversation creation failed: {}", e);
                ClientError::ConversationCreationFailed(e.to_string())
            })?;
        tracing::info!("[CHAT] created conversation {}", conversation.id);
        Ok(self.state.write().await.adopt(conversation))
    }

    /// `GET /ai/conversations`
    pub async fn list_conversations(&self) -> ClientResult<Vec<Conversation>> {
        let conversations = self.api.list_conversations().await?;
        self.state.write().await.known = conversations.clone();
        Ok(conversations)
    }

    /// Replace local state with the server's copy of `conversation_id`
    pub async fn load_messages(&self, conversation_id: &str) -> ClientResult<LoadOutcome> {
        let token = {
            let mut state = self.state.write().await;
            if state.send_slot.is_active() {
                return Err(ClientError::SendInFlight);
            }
            state.load_slot.issue()
        };

        let result = tokio::select! {
            _ = token.cancelled() => return Ok(LoadOutcome::Superseded),
            result = self.api.list_messages(conversation_id) => result,
        };

        let mut state = self.state.write().await;
        if !state.load_slot.is_current(&token) {
            tracing::debug!("[CHAT] dropping superseded load of {}", conversation_id);
            return Ok(LoadOutcome::Superseded);
        }
        state.load_slot.release(&token);
        let remote = result?;

        let messages: Vec<ChatMessage> = remote
            .into_iter()
            .map(|msg| msg.into_chat_message())
            .collect();
        let count = messages.len();
        if state.conversation_id.as_deref() != Some(conversation_id) {
            state.conversation = state
                .known
                .iter()
                .find(|conv| conv.id == conversation_id)
                .cloned();
        }
        state.conversation_id = Some(conversation_id.to_string());
        state.messages = messages;
        tracing::info!("[CHAT] loaded {} messages of {}", count, conversation_id);
        Ok(LoadOutcome::Applied(count))
    }

    // ========== Deletion ==========

    /// Remove a message; durable messages are deleted remotely first
    pub async fn delete_message(&self, id: &MessageId) -> ClientResult<()> {
        let (conversation_id, durable_id) = {
            let state = self.state.read().await;
            let msg = state
                .messages
                .iter()
                .find(|msg| &msg.id == id)
                .ok_or_else(|| ClientError::NotFound("message".to_string()))?;
            if state.active_send == Some(msg.client_id) {
                return Err(ClientError::Busy);
            }
            (
                state.conversation_id.clone(),
                msg.id.durable().map(str::to_string),
            )
        };

        if let (Some(conversation_id), Some(durable_id)) = (conversation_id, durable_id) {
            self.api.delete_message(&conversation_id, &durable_id).await?;
        }

        let mut state = self.state.write().await;
        state.messages.retain(|msg| &msg.id != id);
        tracing::debug!("[CHAT] deleted message {}", id);
        Ok(())
    }

    /// Start a new, empty conversation view
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.send_slot.invalidate();
        state.load_slot.invalidate();
        state.active_send = None;
        state.messages.clear();
        state.conversation = None;
        state.conversation_id = None;
        tracing::info!("[CHAT] conversation view reset");
    }
}
