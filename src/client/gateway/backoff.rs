//! # Reconnect Backoff
//!
//! Delay policy used by the push channel between connection attempts.
//! Send failures are never retried automatically; this is only for keeping
//! the live channel up.
//!
//! ```rust
//! use std::time::Duration;
//! use studysync::client::gateway::{Backoff, BackoffStrategy};
//!
//! let mut backoff = Backoff::new(BackoffStrategy::Exponential {
//!     base: Duration::from_secs(1),
//!     max: Duration::from_secs(30),
//! });
//! assert_eq!(backoff.next_delay(), Duration::from_secs(1));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(2));
//! ```

use std::time::Duration;

/// Backoff strategy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed interval between attempts
    Fixed { interval: Duration },
    /// Doubling interval, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// Attempt tracker for one connection
#[derive(Debug, Clone)]
pub struct Backoff {
    strategy: BackoffStrategy,
    attempt: u32,
}

impl Backoff {
    pub fn new(strategy: BackoffStrategy) -> Self {
        Self {
            strategy,
            attempt: 0,
        }
    }

    /// Number of failed attempts since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.strategy {
            BackoffStrategy::Fixed { interval } => interval,
            BackoffStrategy::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(self.attempt.min(16));
                base.saturating_mul(factor).min(max)
            }
        };
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Call after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
