//! # Function-backed worker (`WorkerFn`)
//!
//! [`WorkerFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`. Every spawn
//! gets a fresh `WorkerFn` with its own stop token, and the closure produces a
//! fresh future from it. The graceful shutdown method of a child built with
//! [`ChildSpec::from_fn`](crate::ChildSpec::from_fn) is [`WorkerFn::stop`],
//! which cancels that token.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use ultravisor::{ChildSpec, WorkerError};
//!
//! let spec = ChildSpec::from_fn("ticker", |stop: CancellationToken| async move {
//!     while !stop.is_cancelled() {
//!         tokio::select! {
//!             _ = stop.cancelled() => break,
//!             _ = tokio::time::sleep(Duration::from_millis(250)) => {}
//!         }
//!     }
//!     Ok::<_, WorkerError>(())
//! });
//! assert_eq!(spec.id(), "ticker");
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::workers::{ChildContext, Worker};

/// Closure-backed worker instance.
pub struct WorkerFn<F> {
    f: Arc<F>,
    stop: CancellationToken,
}

impl<F> WorkerFn<F> {
    /// Creates an instance sharing the closure, with a fresh stop token.
    pub fn new(f: Arc<F>) -> Self {
        Self {
            f,
            stop: CancellationToken::new(),
        }
    }

    /// Asks the running closure to return by cancelling its token.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// True once [`stop`](Self::stop) was called on this instance.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

#[async_trait]
impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    type Output = ();

    async fn run(self: Arc<Self>, _ctx: ChildContext<Self>) -> Result<(), WorkerError> {
        (self.f)(self.stop.clone()).await
    }
}
