//! Bounded exponential backoff for oracle calls.

use crm_core::config::OracleConfig;
use crm_core::oracle::OracleError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff())
    }

    /// Delay before retry number `retry` (0-based): `initial * 2^retry` plus up
    /// to 10% jitter, capped at 30s.
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
            .min(MAX_BACKOFF);
        let jitter_cap = (base.as_millis() / 10) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };
        base + Duration::from_millis(jitter)
    }

    /// Delay before retry number `retry` after `err`. A server-provided
    /// `Retry-After` wins over the computed backoff but obeys the same cap.
    pub fn delay_for(&self, err: &OracleError, retry: u32) -> Duration {
        match err.retry_after() {
            Some(requested) => requested.min(MAX_BACKOFF),
            None => self.backoff(retry),
        }
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent.
    pub async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut retry = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay_for(&err, retry);
                    tracing::warn!(
                        target: "oracle",
                        call = what,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&OracleConfig::default())
    }
}
