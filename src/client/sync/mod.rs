//! # Reconciliation Utilities
//!
//! Shared primitives used by both controllers:
//!
//! - `reconciliation.rs`: dedup-merge, snapshot merge and id promotion
//! - `token.rs`: cancellation tokens with supersession

pub mod reconciliation;
pub mod token;

pub use reconciliation::{dedup_merge, merge_snapshot, newest_first, promote, MergeOutcome, Reconcile};
pub use token::{RequestToken, TokenSlot};
