// SPDX-License-Identifier: GPL-3.0-only

//! Backoff for throttled array API calls
//!
//! Arrays answer bursts of management calls with throttling responses. Those
//! are retried here with exponential backoff and jitter; every other failure
//! is returned to the caller on the first attempt.

use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (1 disables retries)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Runs `call`, retrying while the array reports throttling.
    pub fn call<T, F>(&self, operation: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Result<T, ApiError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        let mut delay = self.initial_delay;

        loop {
            attempt += 1;

            match call() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_throttled() => return Err(e),
                Err(e) => {
                    if attempt >= max_attempts {
                        error!(
                            operation = %operation,
                            attempt = attempt,
                            error = %e,
                            "array kept throttling, giving up"
                        );
                        return Err(e);
                    }

                    // 0.5x to 1.5x of the current delay
                    let jitter = rand::thread_rng().gen_range(0.5..1.5);
                    let jittered = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                    warn!(
                        operation = %operation,
                        attempt = attempt,
                        error = %e,
                        delay_ms = jittered.as_millis() as u64,
                        "array throttled request, backing off"
                    );

                    std::thread::sleep(jittered);

                    delay = Duration::from_secs_f64(
                        (delay.as_secs_f64() * self.backoff_multiplier)
                            .min(self.max_delay.as_secs_f64()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn succeeds_immediately() {
        let result = fast(3).call("op", || Ok::<_, ApiError>(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn retries_throttled_calls_until_success() {
        let count = Cell::new(0);
        let result = fast(5).call("op", || {
            count.set(count.get() + 1);
            if count.get() < 3 {
                Err(ApiError::RateLimited("429".to_string()))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn does_not_retry_other_failures() {
        let count = Cell::new(0);
        let result: Result<(), _> = fast(5).call("op", || {
            count.set(count.get() + 1);
            Err(ApiError::Transport("connection reset".to_string()))
        });
        assert_eq!(result, Err(ApiError::Transport("connection reset".to_string())));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn exhausts_max_attempts() {
        let count = Cell::new(0);
        let result: Result<(), _> = fast(3).call("op", || {
            count.set(count.get() + 1);
            Err(ApiError::RateLimited("429".to_string()))
        });
        assert!(matches!(result, Err(ApiError::RateLimited(_))));
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn none_makes_a_single_attempt() {
        let count = Cell::new(0);
        let _ = RetryPolicy::none().call("op", || {
            count.set(count.get() + 1);
            Err::<(), _>(ApiError::RateLimited("429".to_string()))
        });
        assert_eq!(count.get(), 1);
    }
}
