use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKOFF_BASE_MS: u64 = 2000;

/// Exponential backoff between a failed attempt and its retry:
/// `base * 2^(attempts - 1)`, deterministic given the attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBackoff {
    pub base_ms: u64,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        RetryBackoff {
            base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl RetryBackoff {
    pub const fn new(base_ms: u64) -> Self {
        RetryBackoff { base_ms }
    }

    /// Delay before the next attempt, given `attempts` already made.
    /// `None` once the attempt budget (`max_retries + 1`) is spent.
    pub fn next_delay_in(self, attempts: u32, max_retries: u32) -> Option<Duration> {
        if attempts == 0 || attempts >= max_retries.saturating_add(1) {
            return None;
        }
        let exp = attempts.saturating_sub(1).min(32);
        let delay_ms = self.base_ms.saturating_mul(1u64 << exp);
        Some(Duration::from_millis(delay_ms))
    }
}

#[tokio::test]
async fn backoff_doubles_per_attempt() -> anyhow::Result<()> {
    // arrange
    let backoff = RetryBackoff::new(2000);

    // act & assert
    assert_eq!(
        Some(Duration::from_millis(2000)),
        backoff.next_delay_in(1, 3)
    );
    assert_eq!(
        Some(Duration::from_millis(4000)),
        backoff.next_delay_in(2, 3)
    );
    assert_eq!(
        Some(Duration::from_millis(8000)),
        backoff.next_delay_in(3, 3)
    );
    assert_eq!(None, backoff.next_delay_in(4, 3));
    Ok(())
}

#[tokio::test]
async fn backoff_none_when_retries_disabled() -> anyhow::Result<()> {
    // arrange
    let backoff = RetryBackoff::default();

    // act & assert
    assert_eq!(None, backoff.next_delay_in(1, 0));
    Ok(())
}

#[tokio::test]
async fn backoff_handles_unbounded_retry_ceiling() -> anyhow::Result<()> {
    // arrange: the retry ceiling comes straight from configuration
    let backoff = RetryBackoff::new(10);

    // act & assert: no overflow at the top of the range
    assert!(backoff.next_delay_in(1, u32::MAX).is_some());
    assert_eq!(None, backoff.next_delay_in(u32::MAX, u32::MAX));
    Ok(())
}

#[tokio::test]
async fn backoff_none_before_first_attempt() -> anyhow::Result<()> {
    // A job that never ran has nothing to retry.
    let backoff = RetryBackoff::default();
    assert_eq!(None, backoff.next_delay_in(0, 3));
    Ok(())
}
