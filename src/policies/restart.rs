//! # Restart policy: sliding-window crash-loop detection.
//!
//! A [`RestartPolicy`] bounds how many times a child may terminate within a
//! trailing window of `period` before the supervisor gives up on the whole tree.
//!
//! ## Evaluation
//! The history holds run durations, newest first, and the newest run ended
//! just now. The run at index `i` therefore ended `sum(history[..i])` ago.
//! ```text
//! history (newest first):  [4.99s, 4.99s, 4.99s]     period = 10s
//! ended ago:                 0s    4.99s  9.98s      → 3 terminations in window
//!
//! max = 3 → 3 > 3 false → restart allowed
//! max = 2 → 3 > 2 true  → policy blown
//! ```
//! Walking stops at the first run that ended outside the window; the history
//! is trimmed to the runs inside it.

use std::time::Duration;

use crate::policies::{RestartDelay, RuntimeHistory};

/// Sliding-window restart limit and restart pacing for one child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Length of the trailing window (must be `> 0`).
    pub period: Duration,
    /// Terminations allowed within the window before the policy is blown.
    pub max: usize,
    /// Pause before respawning.
    pub delay: RestartDelay,
}

impl Default for RestartPolicy {
    /// Returns a policy with:
    /// - `period = 5s`;
    /// - `max = 3`;
    /// - `delay = 1s`.
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            max: 3,
            delay: RestartDelay::default(),
        }
    }
}

impl RestartPolicy {
    /// Creates a policy from its three parts.
    pub fn new(period: Duration, max: usize, delay: impl Into<RestartDelay>) -> Self {
        Self {
            period,
            max,
            delay: delay.into(),
        }
    }

    /// Returns true if `history` shows more than `max` terminations within the
    /// trailing `period`. Trims `history` to the runs inside the window.
    pub fn is_blown(&self, history: &mut RuntimeHistory) -> bool {
        let mut elapsed = Duration::ZERO;
        let mut in_window = 0;

        for run in history.iter() {
            if elapsed > self.period {
                break;
            }
            in_window += 1;
            elapsed = elapsed.saturating_add(*run);
        }

        if in_window > self.max {
            return true;
        }
        history.truncate(in_window);
        false
    }

    /// Draws the delay to wait before respawning.
    pub fn restart_delay(&self) -> Duration {
        self.delay.sample()
    }

    /// History capacity needed to evaluate this policy.
    pub(crate) fn history_capacity(&self) -> usize {
        self.max.saturating_add(1)
    }

    /// Checks the shape of the policy, returning a reason on failure.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.period.is_zero() {
            return Err("restart policy period must be positive".to_string());
        }
        self.delay.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[f64]) -> RuntimeHistory {
        values.iter().map(|s| Duration::from_secs_f64(*s)).collect()
    }

    fn policy(period: u64, max: usize) -> RestartPolicy {
        RestartPolicy::new(Duration::from_secs(period), max, Duration::ZERO)
    }

    #[test]
    fn test_three_short_runs_fit_max_three() {
        let mut h = secs(&[4.99, 4.99, 4.99]);
        assert!(!policy(10, 3).is_blown(&mut h));
    }

    #[test]
    fn test_three_short_runs_blow_max_two() {
        let mut h = secs(&[4.99, 4.99, 4.99]);
        assert!(policy(10, 2).is_blown(&mut h));
    }

    #[test]
    fn test_history_never_reaching_period_counts_every_run() {
        let mut h = secs(&[0.0, 0.0, 0.0, 0.0]);
        assert!(policy(5, 3).is_blown(&mut h));

        let mut h = secs(&[0.1, 0.1, 0.1]);
        assert!(!policy(5, 3).is_blown(&mut h));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_old_runs_fall_out_of_window() {
        let mut h = secs(&[1.0, 20.0, 0.0, 0.0, 0.0]);
        assert!(!policy(10, 2).is_blown(&mut h));
        assert_eq!(h.len(), 2, "only the runs that ended inside the window are kept");
    }

    #[test]
    fn test_max_zero_blows_on_any_termination() {
        let mut h = secs(&[30.0]);
        assert!(policy(10, 0).is_blown(&mut h));

        let mut h = secs(&[]);
        assert!(!policy(10, 0).is_blown(&mut h));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let mut h = secs(&[5.0, 5.0, 1.0]);
        assert!(policy(10, 2).is_blown(&mut h), "run ending exactly at the window edge counts");

        let mut h = secs(&[5.0, 5.5, 1.0]);
        assert!(!policy(10, 2).is_blown(&mut h));
    }

    #[test]
    fn test_validation() {
        assert!(RestartPolicy::default().validate().is_ok());
        assert!(policy(0, 3).validate().is_err());

        let bad_range = RestartPolicy::new(
            Duration::from_secs(5),
            3,
            Duration::from_secs(2)..Duration::from_secs(1),
        );
        assert!(bad_range.validate().is_err());
    }
}
