//! Shared Module
//!
//! Types and data structures exchanged with the REST API and the push
//! channel. Everything here is plain data: serialization, validation and
//! configuration, with no network access.

/// Push event types
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Conversation and message types
pub mod messaging;

/// Notification and settings types
pub mod notification;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{EventType, PushEvent};
pub use notification::{Notification, NotificationKind, NotificationSettings, SettingsPatch};
