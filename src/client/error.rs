//! Client Error Types
//!
//! Errors returned by the gateway and the two controllers. Every variant
//! maps to a single human-readable sentence through
//! [`ClientError::user_message`], which is what ends up on failed messages
//! and in UI toasts; the `Display` form keeps the technical detail for logs.
//!
//! Cancellation has no variant: a cancelled send is reported as
//! `SendOutcome::Cancelled`, not as an error.

use crate::shared::SharedError;
use thiserror::Error;

/// Result alias used across the client
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network failure or non-success HTTP status
    #[error("Transport error: {message}")]
    Transport {
        /// HTTP status, absent when the server was never reached
        status: Option<u16>,
        message: String,
    },

    /// Validation, serialization or protocol error detected locally
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// A send is already pending for this conversation
    #[error("a message is already being sent")]
    Busy,

    /// A load was requested while a send holds the conversation
    #[error("cannot load messages while a send is in flight")]
    SendInFlight,

    #[error("conversation creation failed: {0}")]
    ConversationCreationFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid retry: {0}")]
    InvalidRetry(String),

    #[error("no bearer token configured")]
    NotAuthenticated,
}

impl ClientError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    /// One human-readable reason for the failed operation
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport { status, .. } => match status {
                None => "Could not reach the server. Check your connection and try again.",
                Some(401) | Some(403) => "Your session has expired. Please sign in again.",
                Some(404) => "The requested item could not be found.",
                Some(429) => "Too many requests. Please wait a moment and try again.",
                Some(code) if *code >= 500 => {
                    "The server is having trouble right now. Please try again."
                }
                Some(_) => "The request could not be completed. Please try again.",
            }
            .to_string(),
            ClientError::Shared(SharedError::ValidationError { message, .. }) => message.clone(),
            ClientError::Shared(_) => {
                "Received an unexpected response from the server.".to_string()
            }
            ClientError::Busy => "Please wait for the current response to finish.".to_string(),
            ClientError::SendInFlight => {
                "Messages can't be reloaded while a message is being sent.".to_string()
            }
            ClientError::ConversationCreationFailed(_) => {
                "Conversation creation failed. Please try again.".to_string()
            }
            ClientError::NotFound(what) => format!("The {} could not be found.", what),
            ClientError::InvalidRetry(_) => "Only failed messages can be retried.".to_string(),
            ClientError::NotAuthenticated => "You are not signed in.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Shared(SharedError::serialization(err.to_string()));
        }
        ClientError::transport(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Shared(err.into())
    }
}
