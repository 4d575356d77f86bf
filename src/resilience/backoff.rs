// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Exponential backoff for local resource acquisition.
//!
//! Used when opening the queue database: a locked or briefly unavailable
//! SQLite file should not fail startup on the first attempt. Replay of
//! queued mutations does *not* use this; its retries are counted per row
//! across passes (see [`super::retry`]).

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_attempts: usize,
}

impl BackoffConfig {
    /// Opening the queue store: 5 attempts, ~3 seconds worst case.
    #[must_use]
    pub fn store_open() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
            max_attempts: 5,
        }
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
            max_attempts: 3,
        }
    }

    /// Delay to wait after `delay` has been used once.
    #[must_use]
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.factor).min(self.max_delay)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::store_open()
    }
}

/// Run `operation` until it succeeds or `max_attempts` is reached.
pub async fn with_backoff<F, Fut, T, E>(
    operation_name: &str,
    config: &BackoffConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(operation = operation_name, attempts, "Operation succeeded after backoff");
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;
                if attempts >= config.max_attempts {
                    return Err(err);
                }
                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts = config.max_attempts,
                    error = %err,
                    retry_in = ?delay,
                    "Operation failed, backing off"
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_try_success() {
        let result: Result<u8, String> = with_backoff("op", &BackoffConfig::test(), || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u8, String> = with_backoff("op", &BackoffConfig::test(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("locked {n}"))
                } else {
                    Ok(1)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u8, String> = with_backoff("op", &BackoffConfig::test(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("database is locked".to_string()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "database is locked");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            factor: 2.0,
            max_attempts: 5,
        };
        let second = config.next_delay(config.initial_delay);
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(config.next_delay(second), Duration::from_millis(300));
    }
}
