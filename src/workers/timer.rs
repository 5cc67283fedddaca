//! # Hurriable timer.
//!
//! [`HurriableTimer`] is a deadline that any number of tasks can sleep on and
//! that any thread can fire early with [`hurry`](HurriableTimer::hurry). It is
//! the natural building block for periodic workers whose graceful shutdown
//! method should cut the current sleep short:
//!
//! ```text
//! worker thread:  loop { work(); timer.wait().await; if stopping { break } }
//! shutdown path:  stopping = true; timer.hurry();
//! ```
//!
//! Deadlines use `tokio::time::Instant`, so they follow the (monotonic) tokio
//! clock and can be driven by `tokio::time::pause` in tests.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A deadline that can be fired early.
#[derive(Clone, Debug)]
pub struct HurriableTimer {
    deadline: Instant,
    hurried: CancellationToken,
}

impl HurriableTimer {
    /// Creates a timer expiring `timeout` from now.
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            hurried: CancellationToken::new(),
        }
    }

    /// Waits until the timer expires or is hurried.
    pub async fn wait(&self) {
        tokio::select! {
            _ = self.hurried.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// Like [`wait`](Self::wait), but gives up after at most `limit`.
    pub async fn wait_at_most(&self, limit: Duration) {
        let deadline = self.deadline.min(Instant::now() + limit);
        tokio::select! {
            _ = self.hurried.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => {}
        }
    }

    /// Makes every current and future `wait` return immediately. Idempotent.
    pub fn hurry(&self) {
        self.hurried.cancel();
    }

    /// True once the deadline passed or the timer was hurried.
    pub fn is_expired(&self) -> bool {
        self.hurried.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Time left before the deadline; zero once expired.
    pub fn remaining(&self) -> Duration {
        if self.hurried.is_cancelled() {
            return Duration::ZERO;
        }
        self.deadline.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expires_at_deadline() {
        let timer = HurriableTimer::new(Duration::from_secs(10));
        assert!(!timer.is_expired());

        let start = Instant::now();
        timer.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(timer.is_expired());
        assert_eq!(timer.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hurry_wakes_waiters_early() {
        let timer = HurriableTimer::new(Duration::from_secs(3600));
        let waiter = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        let start = Instant::now();
        timer.hurry();
        waiter.await.expect("waiter");
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(timer.is_expired());

        // Hurry is sticky.
        timer.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_at_most_caps_the_wait() {
        let timer = HurriableTimer::new(Duration::from_secs(60));
        let start = Instant::now();
        timer.wait_at_most(Duration::from_secs(2)).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(60));
        assert!(!timer.is_expired());
    }
}
