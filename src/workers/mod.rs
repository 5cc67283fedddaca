//! # Worker abstractions and child specifications.
//!
//! This module provides the worker-side types:
//! - [`Worker`] trait implemented by the code a child runs
//! - [`WorkerFn`] closure-backed worker for simple loops
//! - [`ChildContext`] handed to a running worker (id, generation, inbox)
//! - [`ChildSpec`] / [`ChildSpecBuilder`] how a child is built, restarted and stopped
//! - [`HurriableTimer`] a sleep another thread can cut short

mod context;
mod spec;
mod spec_builder;
mod timer;
mod worker;
mod worker_fn;

pub use context::ChildContext;
pub use spec::{Access, ChildSpec, ShutdownSpec};
pub use spec_builder::ChildSpecBuilder;
pub use timer::HurriableTimer;
pub use worker::Worker;
pub use worker_fn::WorkerFn;
