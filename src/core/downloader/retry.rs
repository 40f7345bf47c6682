//! Bounded retry with exponential backoff for transient download failures.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::LauncherError;

/// Upper bound of the random jitter added to each delay.
const MAX_JITTER_MS: u64 = 250;

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Connection problems, 5xx, 429 and corrupted transfers.
    Transient,
    Permanent,
}

/// Per-task retry configuration.
///
/// `delay = min(base_delay_ms * multiplier^(attempt-1), max_delay_ms) + jitter`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts including the first one (at least 1).
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the next attempt, or `None` when `attempt` (1-indexed,
    /// the one that just failed) should be the last.
    pub fn next_delay(&self, failure: FailureType, attempt: u32) -> Option<Duration> {
        if failure == FailureType::Permanent || attempt >= self.max_attempts() {
            return None;
        }
        Some(self.backoff(attempt))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms = (self.base_delay_ms as f64) * self.multiplier.max(1.0).powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay_ms as f64) as u64;

        let jitter_ms = if self.base_delay_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=MAX_JITTER_MS.min(self.base_delay_ms))
        };
        Duration::from_millis(capped_ms + jitter_ms)
    }
}

pub fn classify_error(error: &LauncherError) -> FailureType {
    match error {
        LauncherError::DownloadFailed { status, .. } => classify_http_status(*status),
        LauncherError::Http(e) => match e.status() {
            Some(status) => classify_http_status(status.as_u16()),
            None if e.is_builder() => FailureType::Permanent,
            None => FailureType::Transient,
        },
        e if e.is_verification() => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 | 429 => FailureType::Transient,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
            max_delay_ms: 300,
            multiplier: 2.0,
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = quick();
        let first = policy.next_delay(FailureType::Transient, 1).unwrap();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(200));
        let second = policy.next_delay(FailureType::Transient, 2).unwrap();
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(300));
        let third = policy.next_delay(FailureType::Transient, 3).unwrap();
        assert!(third >= Duration::from_millis(300) && third <= Duration::from_millis(400));
        assert!(policy.next_delay(FailureType::Transient, 4).is_none());
    }

    #[test]
    fn permanent_failures_and_none_policy_never_retry() {
        assert!(quick().next_delay(FailureType::Permanent, 1).is_none());
        assert!(RetryPolicy::none().next_delay(FailureType::Transient, 1).is_none());

        let zero = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(zero.max_attempts(), 1);
    }

    #[test]
    fn classification() {
        let status = |status| LauncherError::DownloadFailed {
            url: "u".into(),
            status,
        };
        assert_eq!(classify_error(&status(503)), FailureType::Transient);
        assert_eq!(classify_error(&status(429)), FailureType::Transient);
        assert_eq!(classify_error(&status(404)), FailureType::Permanent);
        assert_eq!(classify_error(&status(403)), FailureType::Permanent);

        let mismatch = LauncherError::Sha1Mismatch {
            path: PathBuf::from("/a"),
            expected: "00".into(),
            actual: "11".into(),
        };
        assert_eq!(classify_error(&mismatch), FailureType::Transient);
        assert_eq!(classify_error(&LauncherError::Cancelled), FailureType::Permanent);
        assert_eq!(
            classify_error(&LauncherError::io("/a", std::io::ErrorKind::PermissionDenied.into())),
            FailureType::Permanent
        );
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{ "max_attempts": 5 }"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, RetryPolicy::default().base_delay_ms);
    }
}
