//! Error types used by the ultravisor runtime and its workers.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] errors raised by the supervision runtime itself
//!   (registration, running, cross-thread calls).
//! - [`WorkerError`] errors raised by a worker's entry point; captured as the
//!   child's termination error and used for the `on_failure` restart decision.
//!
//! Both types provide `as_label` for logging/metrics.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the ultravisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A child specification failed validation at registration time.
    #[error("invalid specification for child {child:?}: {reason}")]
    InvalidSpec {
        /// Identifier of the offending child.
        child: Arc<str>,
        /// What was wrong with it.
        reason: String,
    },

    /// A child with the same identifier is already registered.
    #[error("child with id {child:?} already exists")]
    DuplicateChild {
        /// The colliding identifier.
        child: Arc<str>,
    },

    /// [`Supervisor::run`](crate::Supervisor::run) was called while a run loop is active.
    #[error("this supervisor is already running")]
    AlreadyRunning,

    /// A `call` was not serviced because the target worker terminated first.
    #[error("child {child:?} restarted before the call was serviced")]
    ChildRestarted {
        /// Identifier of the child that was called.
        child: Arc<str>,
    },

    /// A child terminated more often than its restart policy allows.
    ///
    /// Never escapes [`Supervisor::run`](crate::Supervisor::run): the event loop
    /// converts it into a supervisor-wide shutdown.
    #[error("child {child:?} has restarted more than {max} times in {period:?}")]
    BlownRestartPolicy {
        /// Identifier of the child.
        child: Arc<str>,
        /// Allowed terminations within the window.
        max: usize,
        /// Length of the sliding window.
        period: Duration,
    },

    /// Direct instance access requested on a child not declared with unsafe access.
    #[error("thread safety violation on child {child:?}: {reason}")]
    ThreadSafety {
        /// Identifier of the child.
        child: Arc<str>,
        /// Which guard tripped.
        reason: &'static str,
    },

    /// `call`/`cast` used on a child that did not enable them.
    #[error("call/cast is not enabled for child {child:?}")]
    CastCallDisabled {
        /// Identifier of the child.
        child: Arc<str>,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn thread for child {child:?}: {source}")]
    Spawn {
        /// Identifier of the child.
        child: Arc<str>,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use ultravisor::RuntimeError;
    ///
    /// let err = RuntimeError::AlreadyRunning;
    /// assert_eq!(err.as_label(), "runtime_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidSpec { .. } => "runtime_invalid_spec",
            RuntimeError::DuplicateChild { .. } => "runtime_duplicate_child",
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::ChildRestarted { .. } => "runtime_child_restarted",
            RuntimeError::BlownRestartPolicy { .. } => "runtime_blown_restart_policy",
            RuntimeError::ThreadSafety { .. } => "runtime_thread_safety",
            RuntimeError::CastCallDisabled { .. } => "runtime_castcall_disabled",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
        }
    }

    pub(crate) fn invalid_spec(child: &Arc<str>, reason: impl Into<String>) -> Self {
        RuntimeError::InvalidSpec {
            child: Arc::clone(child),
            reason: reason.into(),
        }
    }
}

/// # Errors produced by a worker's entry point.
///
/// A worker returning `Err` (or panicking) counts as a failed run: the error is
/// kept as the child's termination error, logged by the supervisor, and makes
/// an `on_failure` child eligible for restart.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The worker panicked; the panic was caught on its own thread.
    #[error("worker panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    ///
    /// # Example
    /// ```
    /// use ultravisor::WorkerError;
    ///
    /// let err = WorkerError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Panicked { .. } => "worker_panicked",
        }
    }

    /// Builds a [`WorkerError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let info = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        WorkerError::Panicked { info }
    }
}

impl From<String> for WorkerError {
    fn from(error: String) -> Self {
        WorkerError::Fail { error }
    }
}

impl From<&str> for WorkerError {
    fn from(error: &str) -> Self {
        WorkerError::fail(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            WorkerError::from_panic(payload.as_ref()),
            WorkerError::Panicked {
                info: "boom".into()
            }
        );

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(
            WorkerError::from_panic(payload.as_ref()).to_string(),
            "worker panicked: kaboom"
        );

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(
            WorkerError::from_panic(payload.as_ref()).as_label(),
            "worker_panicked"
        );
    }

    #[test]
    fn test_labels_are_stable() {
        let child: Arc<str> = Arc::from("db");
        assert_eq!(
            RuntimeError::invalid_spec(&child, "bad").as_label(),
            "runtime_invalid_spec"
        );
        assert_eq!(
            RuntimeError::ChildRestarted { child }.as_label(),
            "runtime_child_restarted"
        );
        assert_eq!(WorkerError::fail("x").as_label(), "worker_failed");
    }
}
