// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waiting for a device to settle after a disruptive operation.

use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PollError<E> {
    /// The probe kept failing transiently until the deadline passed. Holds
    /// the last transient error.
    #[error("timed out after {timeout:?} (last error: {last_error})")]
    Timeout { timeout: Duration, last_error: E },

    /// The probe failed in a way that retrying will not fix.
    #[error(transparent)]
    Fatal(E),
}

/// Waits `step` between attempts for as long as less than `timeout` has
/// passed since the first attempt, so the final attempt happens at or after
/// the deadline.
struct FixedInterval {
    step: Duration,
    timeout: Duration,
    start: Instant,
}

impl FixedInterval {
    fn new(step: Duration, timeout: Duration) -> Self {
        Self { step, timeout, start: Instant::now() }
    }
}

impl Backoff for FixedInterval {
    fn reset(&mut self) {
        self.start = Instant::now();
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        (self.start.elapsed() < self.timeout).then_some(self.step)
    }
}

/// Calls `probe` immediately and then every `step` until it succeeds, fails
/// with an error `is_transient` rejects, or fails transiently once `timeout`
/// has elapsed. A transient failure before the deadline is always retried,
/// even if `step` overshoots it.
pub fn poll_until_stable<T, E, P, R>(
    mut probe: P,
    step: Duration,
    timeout: Duration,
    is_transient: R,
) -> Result<T, PollError<E>>
where
    E: std::fmt::Display,
    P: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    let policy = FixedInterval::new(step, timeout);

    let attempt = || {
        probe().map_err(|e| {
            if is_transient(&e) {
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    };

    let log_retry = |error: E, wait: Duration| {
        info!(%error, "device not stable yet, polling again in {wait:?}");
    };

    backoff::retry_notify(policy, attempt, log_retry).map_err(|e| match e {
        backoff::Error::Permanent(e) => PollError::Fatal(e),
        backoff::Error::Transient { err, .. } => {
            PollError::Timeout { timeout, last_error: err }
        }
    })
}
