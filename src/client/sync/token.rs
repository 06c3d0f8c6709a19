//! # Request Tokens
//!
//! A [`TokenSlot`] holds at most one live [`RequestToken`] for a logical
//! operation (one per conversation for sends, one for the active load).
//! Issuing a new token cancels and supersedes the previous one, and results
//! are only applied when `is_current` still holds for the token the request
//! was started with.

use tokio_util::sync::CancellationToken;

/// Handle identifying one in-flight request
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: u64,
    cancel: CancellationToken,
}

impl RequestToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the token is cancelled or superseded
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

impl PartialEq for RequestToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RequestToken {}

/// Holder of the single live token of an operation slot
#[derive(Debug, Default)]
pub struct TokenSlot {
    issued: u64,
    current: Option<RequestToken>,
}

impl TokenSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token, cancelling whatever was current
    pub fn issue(&mut self) -> RequestToken {
        if let Some(previous) = self.current.take() {
            previous.cancel.cancel();
        }
        self.issued += 1;
        let token = RequestToken {
            id: self.issued,
            cancel: CancellationToken::new(),
        };
        self.current = Some(token.clone());
        token
    }

    /// Identity check made at every resume point
    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.current.as_ref() == Some(token)
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Cancel the current token, returning it
    pub fn invalidate(&mut self) -> Option<RequestToken> {
        let token = self.current.take()?;
        token.cancel.cancel();
        Some(token)
    }

    /// Clear the slot after `token` finished normally
    ///
    /// Returns false (and leaves the slot untouched) if `token` was already
    /// superseded.
    pub fn release(&mut self, token: &RequestToken) -> bool {
        if self.is_current(token) {
            self.current = None;
            true
        } else {
            false
        }
    }
}
