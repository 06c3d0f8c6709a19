//! Reply pacing
//!
//! Assistant replies are revealed after a short simulated typing pause that
//! grows with the reply length and is capped.

use crate::shared::config::AppConfig;
use std::time::Duration;

/// Simulated typing delay for a reply of `len` characters
///
/// `min(len * per_char, cap)`: bounded by `cap` and monotonic in `len`.
///
/// ```rust
/// use std::time::Duration;
/// use studysync::client::messaging::typing_delay;
///
/// let per_char = Duration::from_millis(20);
/// let cap = Duration::from_millis(2000);
/// assert_eq!(typing_delay(10, per_char, cap), Duration::from_millis(200));
/// assert_eq!(typing_delay(10_000, per_char, cap), cap);
/// ```
pub fn typing_delay(len: usize, per_char: Duration, cap: Duration) -> Duration {
    let chars = u32::try_from(len).unwrap_or(u32::MAX);
    per_char.saturating_mul(chars).min(cap)
}

/// Typing pace taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingPace {
    pub per_char: Duration,
    pub cap: Duration,
}

impl TypingPace {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            per_char: Duration::from_millis(config.typing_ms_per_char),
            cap: Duration::from_millis(config.typing_cap_ms),
        }
    }

    /// Delay for `reply`, counted in characters
    pub fn delay_for(&self, reply: &str) -> Duration {
        typing_delay(reply.chars().count(), self.per_char, self.cap)
    }
}

impl Default for TypingPace {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
