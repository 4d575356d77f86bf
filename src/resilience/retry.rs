// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry rule for replayed mutations.
//!
//! | Replay result                  | `retry_count < max` | `retry_count >= max` |
//! |--------------------------------|---------------------|----------------------|
//! | 2xx                            | Synced              | Synced               |
//! | 5xx                            | Retry               | Abandon              |
//! | no response (network error)    | Retry               | Abandon              |
//! | anything else (4xx, 3xx, ...)  | Abandon             | Abandon              |
//!
//! 4xx is never retried, even where a later attempt could succeed (an
//! expired auth token, say). That is a product decision kept as-is.
//!
//! # Example
//!
//! ```
//! use offline_relay::{RetryPolicy, RetryVerdict, ResponseSnapshot};
//!
//! let policy = RetryPolicy::default();
//! let server_error = Ok(ResponseSnapshot::new(503, ""));
//! assert_eq!(policy.verdict(&server_error, 0), RetryVerdict::Retry { next_retry_count: 1 });
//! assert!(matches!(policy.verdict(&server_error, 3), RetryVerdict::Abandon { .. }));
//! ```

use crate::network::NetworkError;
use crate::request::ResponseSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Delivered; drop the row and report success
    Synced,
    /// Transient failure; bump the counter and keep the row
    Retry { next_retry_count: u32 },
    /// Terminal failure; drop the row and report it
    Abandon { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    #[must_use]
    pub fn verdict(
        &self,
        result: &Result<ResponseSnapshot, NetworkError>,
        retry_count: u32,
    ) -> RetryVerdict {
        let can_retry = retry_count < self.max_retries;
        match result {
            Ok(response) if response.is_success() => RetryVerdict::Synced,
            Ok(response) if response.is_server_error() && can_retry => RetryVerdict::Retry {
                next_retry_count: retry_count + 1,
            },
            Ok(response) => RetryVerdict::Abandon {
                reason: format!("HTTP {}", response.status),
            },
            Err(_) if can_retry => RetryVerdict::Retry {
                next_retry_count: retry_count + 1,
            },
            Err(e) => RetryVerdict::Abandon {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Result<ResponseSnapshot, NetworkError> {
        Ok(ResponseSnapshot::new(code, ""))
    }

    fn unreachable() -> Result<ResponseSnapshot, NetworkError> {
        Err(NetworkError::Transport("offline".into()))
    }

    #[test]
    fn test_success_is_synced_regardless_of_count() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.verdict(&status(200), 0), RetryVerdict::Synced);
        assert_eq!(policy.verdict(&status(201), 3), RetryVerdict::Synced);
    }

    #[test]
    fn test_server_error_retries_until_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.verdict(&status(500), 0), RetryVerdict::Retry { next_retry_count: 1 });
        assert_eq!(policy.verdict(&status(502), 2), RetryVerdict::Retry { next_retry_count: 3 });
        assert_eq!(
            policy.verdict(&status(500), 3),
            RetryVerdict::Abandon { reason: "HTTP 500".into() }
        );
    }

    #[test]
    fn test_client_error_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.verdict(&status(400), 0),
            RetryVerdict::Abandon { reason: "HTTP 400".into() }
        );
        assert!(matches!(policy.verdict(&status(401), 0), RetryVerdict::Abandon { .. }));
    }

    #[test]
    fn test_network_error_retries_until_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.verdict(&unreachable(), 1), RetryVerdict::Retry { next_retry_count: 2 });
        assert_eq!(
            policy.verdict(&unreachable(), 3),
            RetryVerdict::Abandon { reason: "network request failed: offline".into() }
        );
    }

    #[test]
    fn test_zero_retries_abandons_immediately() {
        let policy = RetryPolicy::new(0);
        assert!(matches!(policy.verdict(&status(503), 0), RetryVerdict::Abandon { .. }));
    }
}
