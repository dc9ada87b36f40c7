// src/io/retry.rs
//
// Fixed-interval, unbounded retry loop shared by port discovery and port open.

use std::ops::ControlFlow;
use std::time::Duration;

/// Whether the first attempt happens immediately or after one interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// attempt, wait, attempt, ...
    AttemptFirst,
    /// wait, attempt, wait, attempt, ...
    WaitFirst,
}

/// Retry an operation every `interval` until it succeeds or is cancelled.
///
/// There is no attempt limit. Cancellation is only observed between steps;
/// a sleep that has started always runs to completion.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    interval: Duration,
    pacing: Pacing,
}

impl RetryPolicy {
    pub fn new(interval: Duration, pacing: Pacing) -> Self {
        Self { interval, pacing }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `attempt` (called with the 1-based attempt number) until it breaks.
    /// Returns `None` if `cancelled` reported true first.
    pub fn run<T>(
        &self,
        cancelled: impl Fn() -> bool,
        mut attempt: impl FnMut(u64) -> ControlFlow<T>,
    ) -> Option<T> {
        let mut n: u64 = 0;
        loop {
            if n > 0 || self.pacing == Pacing::WaitFirst {
                if cancelled() {
                    return None;
                }
                std::thread::sleep(self.interval);
            }
            if cancelled() {
                return None;
            }
            n += 1;
            if let ControlFlow::Break(value) = attempt(n) {
                return Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Instant;

    #[test]
    fn test_succeeds_after_failures() {
        let policy = RetryPolicy::new(Duration::from_millis(1), Pacing::AttemptFirst);
        let result = policy.run(|| false, |n| {
            if n < 4 {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(n)
            }
        });
        assert_eq!(result, Some(4));
    }

    #[test]
    fn test_attempt_first_does_not_wait() {
        let policy = RetryPolicy::new(Duration::from_secs(60), Pacing::AttemptFirst);
        let start = Instant::now();
        assert_eq!(policy.run(|| false, ControlFlow::Break), Some(1));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_first_waits_before_first_attempt() {
        let interval = Duration::from_millis(20);
        let policy = RetryPolicy::new(interval, Pacing::WaitFirst);
        let start = Instant::now();
        assert_eq!(policy.run(|| false, |_| ControlFlow::Break(())), Some(()));
        assert!(start.elapsed() >= interval);
    }

    #[test]
    fn test_cancel_is_checked_between_attempts() {
        let policy = RetryPolicy::new(Duration::from_millis(1), Pacing::AttemptFirst);
        let attempts = Cell::new(0u64);
        let result: Option<()> = policy.run(
            || attempts.get() >= 3,
            |n| {
                attempts.set(n);
                ControlFlow::Continue(())
            },
        );
        assert_eq!(result, None);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let policy = RetryPolicy::new(Duration::from_millis(1), Pacing::WaitFirst);
        let result: Option<()> = policy.run(|| true, |_| panic!("must not attempt"));
        assert_eq!(result, None);
    }
}
