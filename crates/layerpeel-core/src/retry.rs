//! Bounded retries with exponential backoff for collaborator calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collaborator::CollaboratorError;
use crate::error::{Operation, PeelError};

/// How often, and how patiently, a failing collaborator call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Default for [`max_attempts`](Self::max_attempts).
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default for [`base_delay_ms`](Self::base_delay_ms).
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

    /// A policy that tries once and never sleeps.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Sleep before attempt number `attempt + 1`, given `attempt` failures
    /// so far (`attempt >= 1`).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1_u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Check that the policy can make at least one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`PeelError::InvalidConfig`] if `max_attempts` is zero.
    pub fn validate(&self) -> Result<(), PeelError> {
        if self.max_attempts == 0 {
            return Err(PeelError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: Self::DEFAULT_BASE_DELAY_MS,
        }
    }
}

/// Run `call` until it succeeds, fails permanently, or `policy` runs out of
/// attempts.
///
/// # Errors
///
/// Returns [`PeelError::Collaborator`] carrying the last failure and the
/// number of attempts made.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: Operation,
    mut call: F,
) -> Result<T, PeelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    %operation,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "collaborator call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(source) => {
                return Err(PeelError::Collaborator {
                    operation,
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}
