//! Fixed-delay retry policy for rate-limited upstream calls

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::VisionConfig;

/// Pacing and retry policy for a rate-limited service
///
/// Every call is followed by `inter_call_delay`, whatever its outcome.
/// A failure the caller classifies as retryable waits `backoff` and is
/// retried, at most `max_retries` times; the final outcome is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub inter_call_delay: Duration,
    pub backoff: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(inter_call_delay: Duration, backoff: Duration, max_retries: u32) -> Self {
        Self {
            inter_call_delay,
            backoff,
            max_retries,
        }
    }

    /// Policy with no waiting at all
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, max_retries)
    }

    /// Run `op`, retrying while `is_retryable` says so and retries remain
    pub async fn run<T, E, F, Fut>(&self, mut op: F, is_retryable: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retries = 0;
        loop {
            let outcome = op().await;
            match outcome {
                Err(ref e) if retries < self.max_retries && is_retryable(e) => {
                    retries += 1;
                    tracing::warn!(
                        "Rate limited, waiting {:?} before retry {}/{}",
                        self.backoff,
                        retries,
                        self.max_retries
                    );
                    sleep(self.backoff).await;
                }
                outcome => {
                    sleep(self.inter_call_delay).await;
                    return outcome;
                }
            }
        }
    }
}

impl From<&VisionConfig> for RetryPolicy {
    fn from(config: &VisionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.inter_call_delay_ms),
            Duration::from_millis(config.rate_limit_backoff_ms),
            config.max_retries,
        )
    }
}
