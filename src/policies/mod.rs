//! Restart decisions and restart pacing.
//!
//! This module groups the knobs that control **whether** a terminated child is
//! restarted, **how often** that may happen, **how long** to wait first, and
//! **which siblings** are restarted along with it.
//!
//! ## Contents
//! - [`RestartMode`] when a child is eligible for restart (never / on-failure / always)
//! - [`RestartPolicy`] sliding-window limit on terminations (`period`, `max`, `delay`)
//! - [`RestartDelay`] fixed or uniformly random pause before respawning
//! - [`RuntimeHistory`] bounded ring buffer of recent run durations, newest first
//! - [`Strategy`] blast radius of a restart (one-for-one / all-for-one / rest-for-one)
//!
//! ## Quick wiring
//! ```text
//! ChildSpec { restart: RestartMode, restart_policy: RestartPolicy, .. }
//!      └─► core::child::Child::restart() uses:
//!           - restart_policy.is_blown(&mut history) to detect a crash loop
//!           - restart mode + last termination error to decide
//!      └─► core::supervisor applies Strategy, sleeps restart_policy.restart_delay()
//! ```
//!
//! ## Defaults
//! - `RestartMode::Always`.
//! - `RestartPolicy::default()` → period=5s, max=3, delay=1s.
//! - `Strategy::OneForOne`.

mod delay;
mod history;
mod mode;
mod restart;
mod strategy;

pub use delay::RestartDelay;
pub use history::RuntimeHistory;
pub use mode::RestartMode;
pub use restart::RestartPolicy;
pub use strategy::Strategy;
