//! HTTP API Client
//!
//! reqwest implementation of [`ChatApi`] and [`NotificationApi`]. Every call
//! carries the bearer token; non-success statuses become
//! [`ClientError::Transport`] with the status attached, and `success: false`
//! envelopes are treated the same way.

use super::{ChatApi, MessageExchange, NotificationApi};
use crate::client::config::Config;
use crate::client::error::{ClientError, ClientResult};
use crate::shared::messaging::{
    ChatRequest, ChatResponse, Conversation, CreateConversationRequest,
    CreateConversationResponse, ListConversationsResponse, ListMessagesResponse, RemoteMessage,
    SendMessageRequest, SendMessageResponse,
};
use crate::shared::notification::{
    ListNotificationsResponse, NotificationSettings, UnreadCountResponse,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// REST gateway
#[derive(Debug, Clone)]
pub struct HttpGateway {
    config: Config,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self.config.get_token().ok_or(ClientError::NotAuthenticated)?;
        Ok(self
            .client
            .request(method, self.config.api_url(path))
            .bearer_auth(token))
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        tracing::debug!("[HTTP] request failed: {} - {}", status, error_text);
        Err(ClientError::transport(
            Some(status.as_u16()),
            format!("{} - {}", status, error_text),
        ))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<(StatusCode, T)> {
        let response = self.execute(request).await?;
        let status = response.status();
        Ok((status, response.json::<T>().await?))
    }
}

fn rejected(status: StatusCode, error: Option<String>, what: &str) -> ClientError {
    ClientError::transport(
        Some(status.as_u16()),
        error.unwrap_or_else(|| format!("{} rejected without detail", what)),
    )
}

#[async_trait]
impl ChatApi for HttpGateway {
    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> ClientResult<Conversation> {
        let builder = self.request(Method::POST, "/ai/conversations")?.json(request);
        let (status, body) = self.fetch::<CreateConversationResponse>(builder).await?;
        match body {
            CreateConversationResponse {
                success: true,
                conversation: Some(conversation),
                ..
            } => Ok(conversation),
            CreateConversationResponse { error, .. } => {
                Err(rejected(status, error, "conversation creation"))
            }
        }
    }

    async fn list_conversations(&self) -> ClientResult<Vec<Conversation>> {
        let builder = self.request(Method::GET, "/ai/conversations")?;
        let (_, body) = self.fetch::<ListConversationsResponse>(builder).await?;
        Ok(body.conversations)
    }

    async fn list_messages(&self, conversation_id: &str) -> ClientResult<Vec<RemoteMessage>> {
        let path = format!("/ai/conversations/{}/messages", conversation_id);
        let builder = self.request(Method::GET, &path)?;
        let (_, body) = self.fetch::<ListMessagesResponse>(builder).await?;
        Ok(body.messages)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> ClientResult<MessageExchange> {
        let path = format!("/ai/conversations/{}/messages", conversation_id);
        let builder = self.request(Method::POST, &path)?.json(request);
        let (status, body) = self.fetch::<SendMessageResponse>(builder).await?;
        match body {
            SendMessageResponse {
                success: true,
                user_message,
                assistant_message: Some(reply),
                ..
            } => Ok(MessageExchange { user_message, reply }),
            SendMessageResponse { error, .. } => Err(rejected(status, error, "message send")),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> ClientResult<String> {
        let builder = self.request(Method::POST, "/ai/chat")?.json(request);
        let (status, body) = self.fetch::<ChatResponse>(builder).await?;
        match body {
            ChatResponse {
                success: true,
                response: Some(reply),
                ..
            } => Ok(reply),
            ChatResponse { error, .. } => Err(rejected(status, error, "chat")),
        }
    }

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> ClientResult<()> {
        let path = format!("/ai/conversations/{}/messages/{}", conversation_id, message_id);
        self.execute(self.request(Method::DELETE, &path)?).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for HttpGateway {
    async fn list_notifications(&self) -> ClientResult<ListNotificationsResponse> {
        let builder = self.request(Method::GET, "/notifications")?;
        let (_, body) = self.fetch::<ListNotificationsResponse>(builder).await?;
        Ok(body)
    }

    async fn unread_count(&self) -> ClientResult<u32> {
        let builder = self.request(Method::GET, "/notifications/unread-count")?;
        let (_, body) = self.fetch::<UnreadCountResponse>(builder).await?;
        Ok(body.count)
    }

    async fn mark_read(&self, id: &str) -> ClientResult<()> {
        let path = format!("/notifications/{}/read", id);
        self.execute(self.request(Method::PUT, &path)?).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> ClientResult<()> {
        self.execute(self.request(Method::PUT, "/notifications/mark-all-read")?)
            .await?;
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> ClientResult<()> {
        let path = format!("/notifications/{}", id);
        self.execute(self.request(Method::DELETE, &path)?).await?;
        Ok(())
    }

    async fn get_settings(&self) -> ClientResult<NotificationSettings> {
        let builder = self.request(Method::GET, "/notifications/settings")?;
        let (_, body) = self.fetch::<NotificationSettings>(builder).await?;
        Ok(body)
    }

    async fn update_settings(&self, settings: &NotificationSettings) -> ClientResult<()> {
        let builder = self
            .request(Method::PUT, "/notifications/settings")?
            .json(settings);
        self.execute(builder).await?;
        Ok(())
    }
}
