use std::time::Duration;

use rand::Rng;
use tracing::warn;

use cemantix_common::Guess;

use crate::traits::{GameError, GameResult, GameSession};

/// Max attempts for reads against a game session (the UI goes stale mid-read).
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Bounded retry with exponential backoff and jitter for transient game errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay before the second attempt. Doubles per attempt, plus up to 50% jitter.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let backoff = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = (self.base_delay.as_millis() as u64 / 2).max(1);
        backoff + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }

    /// Whether another attempt should follow a failure on attempt `attempt`.
    pub fn should_retry(&self, attempt: u32, err: &GameError) -> bool {
        err.is_transient() && attempt < self.attempts
    }
}

/// Read visible feedback, retrying transient failures.
pub async fn read_feedback(session: &mut dyn GameSession, policy: &RetryPolicy) -> GameResult<Vec<Guess>> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match session.current_feedback().await {
            Ok(rows) => return Ok(rows),
            Err(e) if policy.should_retry(attempt, &e) => {
                let delay = policy.delay_for(attempt);
                warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Feedback read failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Ask the game whether it shows the success banner, retrying transient failures.
/// Exhausted retries read as "not yet".
pub async fn poll_success(session: &mut dyn GameSession, policy: &RetryPolicy) -> bool {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match session.check_success().await {
            Ok(solved) => return solved,
            Err(e) if policy.should_retry(attempt, &e) => {
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Success check failed");
                return false;
            }
        }
    }
}

/// Pause between guesses. A zero delay still yields to other tasks.
pub async fn pace(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}
