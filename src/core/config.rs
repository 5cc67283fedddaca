//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`], centralized settings for one supervisor.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `SupervisorBuilder::new(config)`
//! 2. **ChildSpec defaults**: `ChildSpec::with_defaults(id, factory, &config)`

use std::time::Duration;

use crate::policies::{RestartMode, RestartPolicy, Strategy};

/// Configuration for one supervisor.
///
/// ## Field semantics
/// - `strategy`: which siblings are restarted along with a failed child
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `restart`: default restart mode for specs built with `with_defaults`
/// - `restart_policy`: default restart policy for specs built with `with_defaults`
/// - `shutdown_timeout`: default graceful shutdown timeout for specs built with `with_defaults`
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Restart strategy applied when a child is restarted.
    pub strategy: Strategy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Default restart mode for children.
    pub restart: RestartMode,

    /// Default restart policy for children.
    pub restart_policy: RestartPolicy,

    /// Default time a child gets to stop before it is killed.
    pub shutdown_timeout: Duration,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `strategy = OneForOne`
    /// - `bus_capacity = 1024`
    /// - `restart = Always`
    /// - `restart_policy = RestartPolicy::default()` (5s window, 3 restarts, 1s delay)
    /// - `shutdown_timeout = 1s`
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            bus_capacity: 1024,
            restart: RestartMode::default(),
            restart_policy: RestartPolicy::default(),
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}
