//! # The worker trait.
//!
//! A [`Worker`] is the code a child runs on its dedicated thread. Each spawn
//! builds a fresh instance through the child's factory and calls
//! [`Worker::run`] on it; the child keeps the instance for as long as the run
//! lasts and drops it afterwards.
//!
//! Other threads never get `&mut` access. They reach a running worker through
//! its inbox (`call`/`cast`, executed by the worker's own thread when it drains
//! the inbox) or, for children declared [`Access::Unsafe`](crate::Access::Unsafe),
//! through a shared `Arc`. State touched from several threads must therefore
//! be interior-mutable (atomics, locks, channels).
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use ultravisor::{ChildContext, Worker, WorkerError};
//!
//! #[derive(Default)]
//! struct Counter {
//!     hits: AtomicU64,
//! }
//!
//! #[async_trait]
//! impl Worker for Counter {
//!     type Output = u64;
//!
//!     async fn run(self: Arc<Self>, mut ctx: ChildContext<Self>) -> Result<u64, WorkerError> {
//!         // Serve call/cast requests until the child is shut down.
//!         ctx.inbox().process_loop(&self).await;
//!         Ok(self.hits.load(Ordering::Relaxed))
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::workers::ChildContext;

/// Code supervised by a child.
#[async_trait]
pub trait Worker: Send + Sync + Sized + 'static {
    /// Value a clean run terminates with, kept as the child's termination value.
    type Output: Clone + Send + Sync + 'static;

    /// Entry point, run once per spawn on the child's thread.
    ///
    /// Returning `Err` (or panicking) marks the run as failed.
    async fn run(self: Arc<Self>, ctx: ChildContext<Self>) -> Result<Self::Output, WorkerError>;
}
