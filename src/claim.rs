//! Allocation of fresh identifiers.
//!
//! Candidate ids are cheap random draws that may collide. Uniqueness comes from
//! the store: every attempt is an atomic find-or-create on the candidate key, and
//! only an attempt that actually created the row wins. A lost attempt is thrown
//! away and a new candidate drawn, up to [`RetryPolicy::max_attempts`] times and
//! within [`RetryPolicy::deadline`].
//!
//! The loop holds no state outside its own future. Dropping the future (for
//! example when the client hangs up and axum drops the handler) stops it at the
//! next attempt or backoff sleep.
//!
//! The deadline can fire while an insert is in flight. That row may still be
//! committed without its id reaching the caller, so a client that retries ends
//! up with a second entity. There is no rollback; the orphan stays.

use std::{future::Future, time::Duration};

use rand::Rng;
use tracing::{debug, warn};

use crate::{db::StoreError, ids::IdGenerator};

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// Outcome of an atomic find-or-create on one key.
#[derive(Debug, Clone, PartialEq)]
pub struct FindOrCreate<T> {
    /// The freshly inserted row, or the row that already held the key.
    pub record: T,
    pub created: bool,
}

impl<T> FindOrCreate<T> {
    pub fn created(record: T) -> Self {
        Self { record, created: true }
    }

    pub fn found(record: T) -> Self {
        Self { record, created: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_base: Duration::from_millis(2),
            deadline: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Full jitter: uniform in `[0, base * 2^retry]`, capped at [`MAX_BACKOFF`].
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let cap = self.backoff_base.saturating_mul(factor).min(MAX_BACKOFF);
        let cap_us = cap.as_micros() as u64;
        if cap_us == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::rng().random_range(0..=cap_us))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClaimError {
    #[error("no free identifier after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("identifier allocation exceeded its {0:?} deadline")]
    DeadlineElapsed(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A row stored under an identifier nobody held before.
#[derive(Debug, Clone, PartialEq)]
pub struct Claimed<T> {
    pub id: String,
    pub record: T,
    pub attempts: u32,
}

/// Draws candidates from `ids` and hands each to `attempt` until one is created.
///
/// `attempt` must perform the atomic find-or-create for its candidate key.
/// Store faults end the loop immediately; only collisions are retried.
pub async fn claim_fresh_id<T, F, Fut>(
    ids: &dyn IdGenerator,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<Claimed<T>, ClaimError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<FindOrCreate<T>, StoreError>>,
{
    let attempts = async {
        let mut made = 0;
        while made < policy.max_attempts {
            if made > 0 {
                let delay = policy.backoff(made - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let candidate = ids.generate();
            made += 1;

            let outcome = attempt(candidate.clone()).await?;
            if outcome.created {
                return Ok(Claimed {
                    id: candidate,
                    record: outcome.record,
                    attempts: made,
                });
            }
            debug!(%candidate, attempt = made, "identifier collision, drawing again");
        }

        warn!(attempts = made, "identifier allocation exhausted");
        Err(ClaimError::Exhausted { attempts: made })
    };

    match tokio::time::timeout(policy.deadline, attempts).await {
        Ok(result) => result,
        Err(_) => {
            warn!(deadline = ?policy.deadline, "identifier allocation timed out");
            Err(ClaimError::DeadlineElapsed(policy.deadline))
        }
    }
}
