//! Client Module
//!
//! Network-facing half of the crate. It talks to the REST API and the push
//! channel and owns the two in-memory views the UI renders.
//!
//! # Architecture
//!
//! - **`config`** - Server URL, bearer token and environment overrides
//! - **`error`** - `ClientError` and its user-facing wording
//! - **`gateway`** - REST calls and the push channel (no business state)
//! - **`sync`** - Dedup-merge, snapshot merge, id promotion, request tokens
//! - **`messaging`** - `ConversationController` for one AI conversation
//! - **`notifications`** - `NotificationService` for one session
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── config.rs
//! ├── error.rs
//! ├── gateway/        - ChatApi / NotificationApi, HttpGateway, PushChannel
//! ├── sync/           - reconciliation primitives and TokenSlot
//! ├── messaging/      - message lifecycle controller, typing pace
//! └── notifications/  - notification synchronization service
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod messaging;
pub mod notifications;
pub mod sync;

pub use config::Config;
pub use error::{ClientError, ClientResult};
