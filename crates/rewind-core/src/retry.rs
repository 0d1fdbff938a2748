//! Reconnect backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default first reconnect delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default reconnect delay ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Exponential backoff parameters for upstream reconnects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backoff {
    /// Delay before the first retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Relative jitter applied around the capped delay.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    ///
    /// `random` should be in `[0.0, 1.0)`; it maps to `[-jitter, +jitter]`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay(&self, attempt: u32, random: f64) -> Duration {
        let exponential = self.base_delay_ms.saturating_mul(1u64 << attempt.min(31));
        let capped = exponential.min(self.max_delay_ms);
        let jitter = 1.0 + (random * 2.0 - 1.0) * self.jitter_factor;
        let millis = ((capped as f64) * jitter).round().max(0.0) as u64;
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> Backoff {
        Backoff {
            jitter_factor: 0.0,
            ..Backoff::default()
        }
    }

    #[test]
    fn doubles_each_attempt() {
        let b = no_jitter();
        assert_eq!(b.delay(0, 0.5), Duration::from_millis(1000));
        assert_eq!(b.delay(1, 0.5), Duration::from_millis(2000));
        assert_eq!(b.delay(3, 0.5), Duration::from_millis(8000));
    }

    #[test]
    fn caps_at_max_delay() {
        let b = no_jitter();
        assert_eq!(b.delay(10, 0.5), Duration::from_millis(30_000));
        assert_eq!(b.delay(u32::MAX, 0.5), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_stays_in_range() {
        let b = Backoff::default();
        assert_eq!(b.delay(0, 0.0), Duration::from_millis(800));
        assert_eq!(b.delay(0, 0.5), Duration::from_millis(1000));
        assert!(b.delay(0, 0.999) <= Duration::from_millis(1200));
    }

    #[test]
    fn deserializes_partial_config() {
        let b: Backoff = serde_json::from_str(r#"{"baseDelayMs":50}"#).unwrap();
        assert_eq!(b.base_delay_ms, 50);
        assert_eq!(b.max_delay_ms, DEFAULT_MAX_DELAY_MS);
    }
}
