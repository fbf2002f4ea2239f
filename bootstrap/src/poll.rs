// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded, fixed-interval polling.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// How often, and how many times, to check a condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }
}

/// Result of a single check of the condition.
#[derive(Debug, Error)]
pub enum CondCheckError<E: std::error::Error + Send + Sync + 'static> {
    /// the condition does not hold yet; check again later
    #[error("poll condition not yet ready")]
    NotYet,
    /// the condition can never hold; stop polling
    #[error("non-retryable error while polling on condition")]
    Failed(#[from] E),
}

#[derive(Debug, Error)]
pub enum Error<E: std::error::Error + Send + Sync + 'static> {
    #[error("condition not met after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("non-retryable error while polling on condition")]
    PermanentError(#[source] E),
}

/// Checks `cond` until it succeeds, fails permanently, or `policy` runs
/// out of attempts.
///
/// The first check happens immediately, and every later check is preceded
/// by a sleep of `policy.interval`. There is no backoff. A policy of zero
/// attempts still checks once.
pub async fn wait_for_condition<O, E, Func, Fut>(
    mut cond: Func,
    policy: &PollPolicy,
) -> Result<O, Error<E>>
where
    Func: FnMut() -> Fut,
    Fut: Future<Output = Result<O, CondCheckError<E>>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match cond().await {
            Ok(output) => return Ok(output),
            Err(CondCheckError::Failed(e)) => {
                return Err(Error::PermanentError(e));
            }
            Err(CondCheckError::NotYet) if attempt >= max_attempts => {
                return Err(Error::Exhausted { attempts: attempt });
            }
            Err(CondCheckError::NotYet) => {
                attempt += 1;
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}
