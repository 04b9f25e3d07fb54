//! Bounded polling with exponential backoff.

use crate::Result;

use std::time::{Duration, Instant};

use tempdb_config::ResilienceSettings;

/// Doubling delay, capped at `max`.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    pub(crate) fn from_settings(settings: &ResilienceSettings) -> Self {
        Self::new(settings.initial_backoff(), settings.max_backoff())
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current.saturating_mul(2), self.max);
        delay
    }
}

/// Outcome of one probe of an external condition.
#[derive(Debug)]
pub(crate) enum Probe<T> {
    Done(T),
    Pending,
}

/// Probe until it reports `Done` or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. The probe always runs at least once, and
/// once more after the final sleep, so a condition met right at the deadline
/// is still seen. A timeout too large to add to the current instant means
/// no deadline.
pub(crate) fn poll_until<T>(
    timeout: Duration,
    mut backoff: Backoff,
    mut probe: impl FnMut() -> Result<Probe<T>>,
) -> Result<Option<T>> {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        if let Probe::Done(value) = probe()? {
            return Ok(Some(value));
        }

        let delay = backoff.next_delay();
        let delay = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                std::cmp::min(delay, deadline - now)
            }
            None => delay,
        };

        std::thread::sleep(delay);
    }
}
