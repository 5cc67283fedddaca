//! Termination queue shared by the supervisor loop and its child threads.
//!
//! Child cleanup pushes [`QueueEntry::ChildExited`]; shutdown requests push
//! [`QueueEntry::Shutdown`]. The run loop pops entries one at a time, so
//! restart decisions are serialized.

use std::sync::Arc;

use tokio::sync::mpsc;

#[derive(Debug)]
pub(crate) enum QueueEntry {
    ChildExited { id: Arc<str>, generation: u64 },
    Shutdown,
}

/// Sending half of a supervisor run's termination queue.
///
/// Only the supervisor creates queues; one exists per call to `run`.
#[derive(Clone, Debug)]
pub struct TerminationQueue {
    tx: mpsc::UnboundedSender<QueueEntry>,
}

impl TerminationQueue {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<QueueEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reports a terminated generation. Dropped if the run loop is gone.
    pub(crate) fn child_exited(&self, id: Arc<str>, generation: u64) {
        let _ = self.tx.send(QueueEntry::ChildExited { id, generation });
    }

    /// Asks the run loop to exit and tear the tree down.
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(QueueEntry::Shutdown);
    }
}
