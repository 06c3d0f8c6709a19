//! Push Event System
//!
//! Events delivered by the live push channel. The only event the
//! notification service acts on is `new_notification`; anything else is
//! carried as `Custom` so that newer servers do not break older clients.

use crate::shared::error::SharedError;
use crate::shared::notification::Notification;
use serde::{Deserialize, Serialize};

/// Name of the push event carrying a full notification record
pub const NEW_NOTIFICATION: &str = "new_notification";

/// Type of push event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A notification was created for the current user
    NewNotification,
    /// Any other named event
    Custom(String),
}

impl EventType {
    /// Map an event name from the wire
    pub fn from_name(name: &str) -> Self {
        match name {
            NEW_NOTIFICATION => EventType::NewNotification,
            other => EventType::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EventType::NewNotification => NEW_NOTIFICATION,
            EventType::Custom(name) => name,
        }
    }
}

/// Event received over the push channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushEvent {
    pub event_type: EventType,
    /// Event payload (JSON)
    pub payload: serde_json::Value,
    /// Optional server-side event id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl PushEvent {
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            payload,
            id: None,
        }
    }

    /// Build a `new_notification` event
    pub fn new_notification(notification: &Notification) -> Result<Self, SharedError> {
        Ok(Self::new(
            EventType::NewNotification,
            serde_json::to_value(notification)?,
        ))
    }

    /// Decode a frame made of an optional event name and its data
    ///
    /// Frames without a name are treated as generic `message` events.
    pub fn from_frame(name: Option<&str>, data: &str) -> Result<Self, SharedError> {
        let payload: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| SharedError::protocol(format!("invalid event data: {}", e)))?;
        let event_type = EventType::from_name(name.unwrap_or("message"));
        Ok(Self::new(event_type, payload))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The notification carried by a `new_notification` event
    pub fn notification(&self) -> Result<Option<Notification>, SharedError> {
        match self.event_type {
            EventType::NewNotification => {
                Ok(Some(serde_json::from_value(self.payload.clone())?))
            }
            EventType::Custom(_) => Ok(None),
        }
    }
}
