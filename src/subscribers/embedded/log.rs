//! # LogWriter: runtime events as tracing records
//!
//! A subscriber that forwards incoming [`Event`]s to `tracing` under the
//! `ultravisor::events` target. Lifecycle noise goes to `debug`, escalations to
//! `warn`, and anything that stops the tree to `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG ultravisor::events: child starting child="db" generation=3
//!  WARN ultravisor::events: child failed child="db" generation=3 reason="connection refused"
//!  INFO ultravisor::events: restart scheduled child="db" delay_ms=1000 strategy="one_for_one"
//! ERROR ultravisor::events: restart policy blown child="db" reason="..."
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "ultravisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let child = e.child.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ChildStarting => {
                tracing::debug!(target: TARGET, child, generation = e.generation, "child starting");
            }
            EventKind::ChildStopped => {
                tracing::debug!(target: TARGET, child, generation = e.generation, "child stopped");
            }
            EventKind::ChildFailed => {
                tracing::warn!(target: TARGET, child, generation = e.generation, reason, "child failed");
            }
            EventKind::ChildKilled => {
                tracing::info!(target: TARGET, child, generation = e.generation, "child killed");
            }
            EventKind::ShutdownTimeout => {
                tracing::warn!(target: TARGET, child, timeout_ms = e.timeout_ms, "graceful shutdown timed out");
            }
            EventKind::ThreadAbandoned => {
                tracing::error!(target: TARGET, child, generation = e.generation, "thread abandoned");
            }
            EventKind::RestartScheduled => {
                tracing::info!(target: TARGET, child, delay_ms = e.delay_ms, strategy = reason, "restart scheduled");
            }
            EventKind::RestartPolicyBlown => {
                tracing::error!(target: TARGET, child, reason, "restart policy blown");
            }
            EventKind::ChildAdded => {
                tracing::info!(target: TARGET, child, "child added");
            }
            EventKind::ChildRemoved => {
                tracing::info!(target: TARGET, child, "child removed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: TARGET, reason, "shutdown requested");
            }
            EventKind::SupervisorStopped => {
                tracing::info!(target: TARGET, "supervisor stopped");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: TARGET, subscriber = child, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: TARGET, subscriber = child, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
