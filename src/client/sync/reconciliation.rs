//! # State Reconciliation
//!
//! Merges independently sourced copies of the same entities into one
//! deduplicated list.
//!
//! ## Rules
//!
//! - **Uniqueness**: an id appears at most once in a list.
//! - **Newest wins**: an incoming copy replaces the stored one only when its
//!   timestamp is strictly newer.
//! - **Order**: lists are kept newest-first; equal timestamps are ordered by
//!   id so that the result does not depend on arrival order.
//! - **Promotion**: a transient message is replaced in place by its durable
//!   echo, matched on the client correlation key.

use crate::shared::messaging::{ChatMessage, MessageId};
use crate::shared::notification::Notification;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;

/// An entity that can be deduplicated by id and compared by age
pub trait Reconcile: Clone {
    fn key(&self) -> &str;
    fn version(&self) -> DateTime<Utc>;
}

impl Reconcile for Notification {
    fn key(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// What `dedup_merge` did with the incoming item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome<T> {
    /// No entry shared the id; the item was inserted
    Inserted,
    /// An older entry was replaced; carries the previous value
    Replaced(T),
    /// An entry with the same id and an equal or newer timestamp exists
    Ignored,
}

/// Newest-first ordering with an id tie-break
pub fn newest_first<T: Reconcile>(a: &T, b: &T) -> Ordering {
    b.version()
        .cmp(&a.version())
        .then_with(|| a.key().cmp(b.key()))
}

/// Insert or replace `item` in a newest-first list
pub fn dedup_merge<T: Reconcile>(list: &mut Vec<T>, item: T) -> MergeOutcome<T> {
    let outcome = match list.iter().position(|existing| existing.key() == item.key()) {
        Some(pos) if item.version() > list[pos].version() => MergeOutcome::Replaced(list.remove(pos)),
        Some(_) => return MergeOutcome::Ignored,
        None => MergeOutcome::Inserted,
    };
    let at = list.partition_point(|existing| newest_first(existing, &item) == Ordering::Less);
    list.insert(at, item);
    outcome
}

/// Merge an authoritative snapshot with the local list
///
/// Snapshot entries win unless the local copy is strictly newer. Local
/// entries missing from the snapshot survive only if their id is in
/// `keep`, i.e. they arrived by push after the snapshot was taken.
pub fn merge_snapshot<T: Reconcile>(snapshot: Vec<T>, local: &[T], keep: &HashSet<String>) -> Vec<T> {
    let mut merged = Vec::with_capacity(snapshot.len());
    for item in snapshot {
        dedup_merge(&mut merged, item);
    }
    let in_snapshot: HashSet<String> = merged.iter().map(|item| item.key().to_string()).collect();
    for item in local {
        if in_snapshot.contains(item.key()) || keep.contains(item.key()) {
            dedup_merge(&mut merged, item.clone());
        }
    }
    merged
}

/// Replace the transient id of the message correlated by `client_id`
///
/// Only user messages that still carry a transient id are promoted; the slot
/// keeps its position and local timestamp.
pub fn promote(list: &mut [ChatMessage], client_id: Uuid, durable_id: impl Into<String>) -> bool {
    match list
        .iter_mut()
        .find(|msg| msg.is_user() && msg.client_id == client_id && !msg.id.is_durable())
    {
        Some(msg) => {
            msg.id = MessageId::Durable(durable_id.into());
            true
        }
        None => false,
    }
}
