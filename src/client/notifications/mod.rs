//! # Notification Synchronization
//!
//! [`NotificationService`] keeps the notification list, unread badge and
//! settings of one session in sync with the REST store and the push channel.

pub mod service;

pub use service::{NotificationService, SnapshotOutcome};
