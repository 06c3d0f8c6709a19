//! StudySync - Message Delivery and Notification Sync
//!
//! Client-side engine of a learning-management application: it drives an AI
//! conversation through an optimistic send/receive lifecycle and keeps a
//! notification list in sync with both a REST store and a live push channel.
//!
//! # Overview
//!
//! - Optimistic message sends with cancellation, fallback endpoint and retry
//! - Simulated typing delay before replies are revealed
//! - Notification list merged from REST snapshots and server-sent events
//! - Read/unread tracking and settings with rollback on failure
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types, push events, errors and configuration
//!   - Conversation and message structures
//!   - Notification, settings and quiet hours
//!   - `SharedError`, `AppConfig`
//!
//! - **`client`** - Gateway and the two controllers
//!   - `HttpGateway` and `PushChannel`
//!   - `ConversationController`
//!   - `NotificationService`
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studysync::client::gateway::HttpGateway;
//! use studysync::client::messaging::{ConversationController, SendOutcome};
//! use studysync::client::Config;
//! use studysync::shared::messaging::SenderContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?.with_token("bearer-token");
//! let gateway = Arc::new(HttpGateway::new(config.clone()));
//! let chat = ConversationController::new(gateway, config.app());
//!
//! let sender = SenderContext::new("u-1", "Ada");
//! if let SendOutcome::Delivered(reply) = chat.send_message("Explain recursion", sender).await? {
//!     println!("{}", reply.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Controllers keep their state behind `tokio::sync::RwLock` and expose
//! `&self` methods, so a send and a cancel can run concurrently on one task.
//! Locks are never held across network calls or timers. Every result is
//! checked against the request token it was started with before it is
//! applied.
//!
//! # Error Handling
//!
//! - `ClientError` for everything that touches the network or controller state
//! - `SharedError` for validation, serialization and protocol errors
//! - `ConfigError` for invalid configuration
//!
//! `ClientError::user_message` gives the single human-readable reason shown
//! for a failed operation.

/// Shared types and data structures
pub mod shared;

/// Gateway, reconciliation and controllers
pub mod client;
