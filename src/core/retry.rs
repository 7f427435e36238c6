//! Retry logic with exponential backoff
//!
//! Read-only platform calls (sync, listings) go through [`RetryManager`].
//! Mutating calls are issued exactly once.

use crate::core::error::PromoteError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Options for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    /// Options that never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Retry manager for executing operations with exponential backoff
///
/// # Examples
///
/// ```no_run
/// use package_promoter::core::{PromoteError, RetryManager, RetryOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), PromoteError> {
///     let manager = RetryManager::new(RetryOptions::default());
///
///     let listing = manager
///         .retry("sync", || async { Ok::<_, PromoteError>(vec!["package"]) })
///         .await?;
///
///     assert_eq!(listing.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    options: RetryOptions,
}

impl RetryManager {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Execute the given async operation, retrying retryable failures
    ///
    /// Errors for which [`PromoteError::is_retryable`] is false are returned
    /// immediately. After `max_attempts` the last error is returned.
    pub async fn retry<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, PromoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PromoteError>>,
    {
        let max_delay = self.options.max_delay;
        let mut delay = self.options.initial_delay.min(max_delay);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.options.max_attempts {
                        return Err(error);
                    }

                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.options.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after transient failure"
                    );

                    sleep(delay).await;

                    // Negative, NaN or overflowing products fall back to the cap
                    delay = Duration::try_from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .unwrap_or(max_delay)
                    .min(max_delay);
                    attempt += 1;
                }
            }
        }
    }
}
