//! # Runtime events emitted by the supervisor and its children.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Child lifecycle**: a child thread starting, stopping, failing or being killed
//! - **Shutdown escalation**: graceful timeouts and abandoned threads
//! - **Supervision**: restarts scheduled, restart policy blown, children added/removed
//! - **Subscriber health**: overflowing or panicking subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, child id,
//! spawn generation, reasons and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use ultravisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ChildFailed)
//!     .with_child("db")
//!     .with_generation(7)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::ChildFailed);
//! assert_eq!(ev.child.as_deref(), Some("db"));
//! assert_eq!(ev.generation, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `child`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `child`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Child lifecycle events ===
    /// A child thread was launched with a fresh worker instance.
    ///
    /// Sets:
    /// - `child`: child id
    /// - `generation`: spawn generation
    ChildStarting,

    /// The worker returned `Ok` (or was stopped through its shutdown method).
    ///
    /// Sets:
    /// - `child`: child id
    /// - `generation`: spawn generation
    ChildStopped,

    /// The worker returned an error or panicked.
    ///
    /// Sets:
    /// - `child`: child id
    /// - `generation`: spawn generation
    /// - `reason`: error message
    ChildFailed,

    /// The worker was killed (forced shutdown) before it finished.
    ///
    /// Sets:
    /// - `child`: child id
    /// - `generation`: spawn generation
    ChildKilled,

    // === Shutdown escalation ===
    /// The graceful shutdown method did not stop the worker in time; escalating to a kill.
    ///
    /// Sets:
    /// - `child`: child id
    /// - `generation`: spawn generation
    /// - `timeout_ms`: configured shutdown timeout (ms)
    ShutdownTimeout,

    /// The worker thread ignored the kill; its cleanup was performed by the
    /// shutdown path and the OS thread was left behind.
    ///
    /// Sets:
    /// - `child`: child id
    /// - `generation`: spawn generation
    ThreadAbandoned,

    // === Supervision events ===
    /// A restart was decided; the child will be respawned after `delay_ms`.
    ///
    /// Sets:
    /// - `child`: id of the child that terminated
    /// - `delay_ms`: delay before respawn (ms)
    /// - `reason`: strategy label
    RestartScheduled,

    /// A child terminated more often than its restart policy allows; the
    /// supervisor shuts the whole tree down.
    ///
    /// Sets:
    /// - `child`: child id
    /// - `reason`: error message
    RestartPolicyBlown,

    /// A child was registered with the supervisor.
    ///
    /// Sets:
    /// - `child`: child id
    ChildAdded,

    /// A child was removed from the supervisor.
    ///
    /// Sets:
    /// - `child`: child id
    ChildRemoved,

    /// Supervisor shutdown requested (API call, OS signal or blown policy).
    ///
    /// Sets:
    /// - `reason`: `"graceful"`, `"force"` or `"signal"`
    ShutdownRequested,

    /// The supervisor run loop exited and every child is stopped.
    SupervisorStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Shutdown timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Spawn generation of the child thread, if applicable.
    pub generation: Option<u64>,
    /// Child id (or subscriber name), if applicable.
    pub child: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            generation: None,
            timeout_ms: None,
            reason: None,
            delay_ms: None,
            child: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a child id.
    #[inline]
    pub fn with_child(mut self, child: impl Into<Arc<str>>) -> Self {
        self.child = Some(child.into());
        self
    }

    /// Attaches a spawn generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_child(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_child(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
