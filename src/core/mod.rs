//! Runtime core: children, the supervisor and its run loop.
//!
//! Internal modules:
//! - [`child`]: one supervised worker thread per generation, call/cast, shutdown;
//! - [`supervisor`]: registration, run loop, restart strategies, teardown;
//! - [`queue`]: termination queue feeding the run loop;
//! - [`inbox`]: per-generation call/cast mailbox;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod child;
mod config;
mod inbox;
mod queue;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use child::{Child, SupervisedChild};
pub use config::SupervisorConfig;
pub use inbox::{Envelope, Inbox};
pub use queue::TerminationQueue;
pub use supervisor::Supervisor;
