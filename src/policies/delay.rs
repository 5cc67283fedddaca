//! # Restart delay.
//!
//! [`RestartDelay`] is the pause the supervisor takes between stopping the
//! affected children and respawning them.
//!
//! - [`RestartDelay::Fixed`] always the same pause.
//! - [`RestartDelay::Range`] uniformly random in `[start, end)`, which spreads
//!   out restarts of many children failing on the same cause.

use std::ops::Range;
use std::time::Duration;

use rand::Rng;

/// Pause before a child (and its cascaded siblings) is respawned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestartDelay {
    /// Exact delay.
    Fixed(Duration),
    /// Uniformly random delay in `[start, end)`; `start` must be below `end`.
    Range(Range<Duration>),
}

impl Default for RestartDelay {
    /// Returns a fixed one second delay.
    fn default() -> Self {
        RestartDelay::Fixed(Duration::from_secs(1))
    }
}

impl From<Duration> for RestartDelay {
    fn from(d: Duration) -> Self {
        RestartDelay::Fixed(d)
    }
}

impl From<Range<Duration>> for RestartDelay {
    fn from(r: Range<Duration>) -> Self {
        RestartDelay::Range(r)
    }
}

impl RestartDelay {
    /// Draws the next delay.
    pub fn sample(&self) -> Duration {
        match self {
            RestartDelay::Fixed(d) => *d,
            RestartDelay::Range(r) if r.start >= r.end => r.start,
            RestartDelay::Range(r) => rand::rng().random_range(r.clone()),
        }
    }

    /// Checks the shape of the delay, returning a reason on failure.
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            RestartDelay::Fixed(_) => Ok(()),
            RestartDelay::Range(r) if r.start >= r.end => Err(format!(
                "restart delay range {:?}..{:?} must be increasing",
                r.start, r.end
            )),
            RestartDelay::Range(_) => Ok(()),
        }
    }
}
