//! Bounded polling for fill confirmation

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Shortest sleep between polls; guards against a zero interval spinning
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Result of a bounded poll
#[derive(Debug)]
pub struct PollOutcome<T> {
    /// The terminal value, or `None` if the deadline passed first
    pub value: Option<T>,
    pub polls: usize,
    pub elapsed: Duration,
}

impl<T> PollOutcome<T> {
    pub fn timed_out(&self) -> bool {
        self.value.is_none()
    }
}

/// Call `poll` every `interval` until it yields a value or `timeout` elapses
///
/// The first poll happens immediately. Each poll and each sleep is clipped to
/// the deadline, so a slow or never-terminal poll returns after `timeout`, not
/// before and not a full interval or request later. A poll cut off by the
/// deadline counts as still pending.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut poll: F,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let interval = interval.max(MIN_POLL_INTERVAL);
    let start = Instant::now();
    let deadline = start + timeout;
    let mut polls = 0;

    loop {
        polls += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Ok(Some(value)) = tokio::time::timeout(remaining, poll()).await {
            return PollOutcome {
                value: Some(value),
                polls,
                elapsed: start.elapsed(),
            };
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(interval.min(remaining)).await;
        if Instant::now() >= deadline {
            break;
        }
    }

    PollOutcome {
        value: None,
        polls,
        elapsed: start.elapsed(),
    }
}
