//! Rate-limit-aware retry for streaming model calls

use std::future::Future;
use std::time::Duration;

use tern_model::ApiError;

/// Hook invoked before each retry sleep: `(attempt, max_retries, delay_ms, error)`
pub type RetryHook = dyn Fn(u32, u32, u64, &ApiError) + Send + Sync;

/// Retry configuration wrapping the model call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Ceiling for the backoff delay
    pub max_delay: Duration,
    /// Retry every error, not just rate limits
    pub retry_all_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            retry_all_errors: false,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay for a 0-indexed attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = u32::try_from(2u64.saturating_pow(attempt)).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }

    /// Interpret a server `retry-after`/`x-ratelimit-reset` value. A number
    /// larger than the current epoch seconds is an absolute timestamp, else
    /// it is seconds-to-wait; the non-negative delta wins.
    pub fn server_delay(hint: Option<f64>, now_secs: f64) -> Option<Duration> {
        hint.map(|value| {
            let secs = if value > now_secs {
                value - now_secs
            } else {
                value
            };
            Duration::from_secs_f64(secs.max(0.0))
        })
    }

    /// The larger of the server hint and exponential backoff
    pub fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        let backoff = self.backoff_delay(attempt);
        let now_secs = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        match Self::server_delay(error.retry_after(), now_secs) {
            Some(server) => server.max(backoff),
            None => backoff,
        }
    }

    /// Run `op`, retrying rate-limit errors (or everything when
    /// `retry_all_errors` is set) with the computed delays.
    pub async fn run<T, F, Fut>(
        &self,
        mut op: F,
        on_retry: Option<&RetryHook>,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let retryable = e.is_rate_limit() || self.retry_all_errors;
                    if !retryable || attempt >= self.max_retries {
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt, &e);
                    attempt += 1;
                    if let Some(hook) = on_retry {
                        hook(attempt, self.max_retries, delay.as_millis() as u64, &e);
                    }
                    tracing::warn!(
                        attempt,
                        max = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "model call failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
