//! # ultravisor
//!
//! **Ultravisor** supervises long-lived workers, each on its own OS thread,
//! the way an Erlang/OTP supervisor does.
//!
//! Every child is described by a [`ChildSpec`]: how to build a fresh worker,
//! when to restart it ([`RestartMode`]), how often restarts may happen
//! ([`RestartPolicy`]) and how to stop it ([`ShutdownSpec`]). The
//! [`Supervisor`] starts children in registration order, restarts them as they
//! terminate according to its [`Strategy`], and stops everything in reverse
//! order when asked to, or when a child crash-loops past its policy.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  ChildSpec   │   │  ChildSpec   │   │  ChildSpec   │
//!     │  (worker a)  │   │  (worker b)  │   │  (worker c)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - children (registration order)                                  │
//! │  - TerminationQueue + run loop (one entry at a time)              │
//! │  - Bus (broadcast events) → SubscriberSet                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Child a    │   │   Child b    │   │   Child c    │
//!     │ thread + rt  │   │ thread + rt  │   │ thread + rt  │
//!     │ inbox (opt.) │   │ inbox (opt.) │   │ inbox (opt.) │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ on exit:         │                  │
//!      │ - record value / error / runtime    │
//!      │ - publish ChildStopped/Failed/Killed│
//!      │ - enqueue ChildExited{id, g}        │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TerminationQueue ──► Supervisor::child_exited                    │
//! │    RestartMode + RestartPolicy → stop siblings (Strategy)         │
//! │                                → sleep(delay) → respawn           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Child lifecycle
//! ```text
//! spawn ──► ChildStarting{g} ──► Worker::run(ctx)
//!                                   │
//!     ├─ Ok(value)  ──► ChildStopped  (termination_value = value)
//!     ├─ Err / panic ─► ChildFailed   (termination_error = error)
//!     └─ killed     ──► ChildKilled
//!
//! shutdown(force = false):
//!   graceful method ─► wait ≤ timeout ─► kill ─► wait grace ─► abandon thread
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Workers**       | Code a child runs; closures or full types with an inbox.      | [`Worker`], [`WorkerFn`], [`ChildContext`] |
//! | **Specs**         | Per-child restart, policy, shutdown, access, call/cast.       | [`ChildSpec`], [`ChildSpecBuilder`]        |
//! | **Policies**      | Restart modes, sliding-window limits, delays, strategies.     | [`RestartPolicy`], [`Strategy`]            |
//! | **Supervision**   | Run loop, dynamic children, typed lookup, shutdown.           | [`Supervisor`], [`Child`]                  |
//! | **Messaging**     | Run closures on a worker's own thread.                        | [`Child::call`], [`Child::cast`]           |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).        | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors for the runtime and for workers.                 | [`RuntimeError`], [`WorkerError`]          |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use ultravisor::{ChildSpec, RestartMode, Supervisor, SupervisorConfig, WorkerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hello = ChildSpec::from_fn("hello", |_stop: CancellationToken| async move {
//!         println!("Hello from a supervised thread!");
//!         Ok::<(), WorkerError>(())
//!     })
//!     .with_restart(RestartMode::OnFailure);
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_child(hello)?
//!         .build();
//!
//!     let runner = {
//!         let sup = Arc::clone(&sup);
//!         tokio::spawn(async move { sup.run().await })
//!     };
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     sup.shutdown(true, false).await;
//!     runner.await??;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use core::{
    Child, Envelope, Inbox, SupervisedChild, Supervisor, SupervisorBuilder, SupervisorConfig,
    TerminationQueue,
};
pub use error::{RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{RestartDelay, RestartMode, RestartPolicy, RuntimeHistory, Strategy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use workers::{
    Access, ChildContext, ChildSpec, ChildSpecBuilder, HurriableTimer, ShutdownSpec, Worker,
    WorkerFn,
};
