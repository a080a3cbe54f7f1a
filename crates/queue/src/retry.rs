//! Retry policy and dead-letter records.
//!
//! Transient failures are retried with exponential backoff. Jobs that
//! exhaust their attempts become dead letters: logged in full so an
//! operator can requeue them, never silently dropped.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff policy for failed jobs.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts before a job is dead-lettered.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling on the backoff between attempts.
    pub max_backoff: Duration,
    /// Growth factor applied per attempt.
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60 * 60 * 24),
            factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (0-indexed).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt >= self.max_attempts {
            return self.max_backoff;
        }

        let secs = self.initial_backoff.as_secs_f64() * self.factor.powi(attempt as i32);
        if secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Whether a job that already failed `attempts` times gets another try.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Terminal failure record for a job that exhausted its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry<T> {
    /// The failed job.
    pub job: T,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Error reported by the final attempt.
    pub last_error: String,
    /// When the final attempt failed.
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

impl<T> DeadLetterEntry<T> {
    /// Record a job's terminal failure.
    pub fn new(job: T, attempts: u32, last_error: String) -> Self {
        Self {
            job,
            attempts,
            last_error,
            failed_at: chrono::Utc::now(),
        }
    }
}
