//! # Runtime history.
//!
//! Fixed-capacity ring buffer of the durations of a child's most recent runs,
//! newest first. The capacity follows the restart policy (`max + 1`): that is
//! all the evaluator needs to tell whether the window holds more than `max`
//! terminations, so memory stays bounded however long the supervisor lives.

use std::collections::VecDeque;
use std::time::Duration;

/// Durations of the latest runs of one child, newest first.
#[derive(Clone, Debug)]
pub struct RuntimeHistory {
    runs: VecDeque<Duration>,
    capacity: usize,
}

impl RuntimeHistory {
    /// Creates an empty history holding at most `capacity` runs (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            runs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a finished run, evicting the oldest entry when full.
    pub fn record(&mut self, run: Duration) {
        if self.runs.len() == self.capacity {
            self.runs.pop_back();
        }
        self.runs.push_front(run);
    }

    /// Iterates run durations, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Duration> + '_ {
        self.runs.iter()
    }

    /// Keeps only the `n` newest entries.
    pub fn truncate(&mut self, n: usize) {
        self.runs.truncate(n);
    }

    /// Number of recorded runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True if nothing was recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Maximum number of retained runs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl FromIterator<Duration> for RuntimeHistory {
    /// Builds a history from durations given newest first.
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        let runs: VecDeque<Duration> = iter.into_iter().collect();
        let capacity = runs.len().max(1);
        Self { runs, capacity }
    }
}
