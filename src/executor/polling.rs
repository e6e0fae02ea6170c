use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::error::StepError;

/// Longest uninterrupted sleep; cancellation is noticed within this slice.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Ready { value: T, waited: Duration },
    TimedOut { waited: Duration },
}

/// Call `attempt` until it yields a value or `timeout` elapses, sleeping
/// `interval` between attempts.
///
/// `attempt` always runs at least once, so a zero timeout is a single probe.
/// Errors from `attempt` end the poll immediately; a cancelled token ends it
/// with [`StepError::SafetyAbort`].
pub fn poll_until<T>(
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
    mut attempt: impl FnMut() -> Result<Option<T>, StepError>,
) -> Result<PollOutcome<T>, StepError> {
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(StepError::SafetyAbort);
        }
        if let Some(value) = attempt()? {
            return Ok(PollOutcome::Ready {
                value,
                waited: start.elapsed(),
            });
        }
        let waited = start.elapsed();
        if waited >= timeout {
            return Ok(PollOutcome::TimedOut { waited });
        }
        sleep_cancellable(interval.min(timeout - waited), cancel)?;
    }
}

/// Sleep for `duration` in short slices, bailing out once `cancel` fires.
///
/// A duration past the clock's range sleeps until cancelled.
pub fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> Result<(), StepError> {
    let deadline = Instant::now().checked_add(duration);
    loop {
        if cancel.is_cancelled() {
            return Err(StepError::SafetyAbort);
        }
        let remaining = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(());
                }
                deadline - now
            }
            None => SLEEP_SLICE,
        };
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}
