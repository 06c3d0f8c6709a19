//! # Message Lifecycle
//!
//! - `controller.rs`: [`ConversationController`], the owner of one
//!   conversation's message list
//! - `pacing.rs`: simulated typing delay before replies are shown

pub mod controller;
pub mod pacing;

pub use controller::{ConversationController, LoadOutcome, SendOutcome};
pub use pacing::{typing_delay, TypingPace};
