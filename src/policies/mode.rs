//! # Restart modes for supervised children.
//!
//! [`RestartMode`] determines whether a child is eligible for restart after its
//! worker terminates.
//!
//! - [`RestartMode::Always`] the child is respawned whatever the outcome (default).
//! - [`RestartMode::OnFailure`] the child is respawned only if its worker failed.
//! - [`RestartMode::Never`] the child runs once and stays stopped.
//!
//! ## Choosing the right mode
//!
//! **Long-running services** (servers, pollers, shippers):
//! ```text
//! RestartMode::Always     → any exit is unexpected, bring it back
//! ```
//!
//! **Jobs that may legitimately finish**:
//! ```text
//! RestartMode::OnFailure  → clean return stays stopped, error/panic restarts
//! ```
//!
//! **One-shot children**:
//! ```text
//! RestartMode::Never      → runs once; also exempt from sibling cascades
//! ```
//!
//! Eligibility is always subject to the child's
//! [`RestartPolicy`](crate::RestartPolicy): a child that terminates too often
//! inside the policy window takes the whole supervisor down instead.

/// Policy controlling whether a child is restarted after its worker terminates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartMode {
    /// Always restart, whether the worker returned or failed (default).
    #[default]
    Always,
    /// Restart only when the last run ended with a [`WorkerError`](crate::WorkerError).
    OnFailure,
    /// Never restart.
    Never,
}

impl RestartMode {
    /// Returns whether a run ending with (`failed = true`) or without an error
    /// should be followed by a restart.
    #[inline]
    pub fn wants_restart(&self, failed: bool) -> bool {
        match self {
            RestartMode::Always => true,
            RestartMode::OnFailure => failed,
            RestartMode::Never => false,
        }
    }
}
