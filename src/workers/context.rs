//! Per-run context handed to [`Worker::run`](crate::Worker::run).

use std::sync::Arc;

use crate::core::Inbox;

/// What a worker knows about the run it is executing.
pub struct ChildContext<W> {
    id: Arc<str>,
    generation: u64,
    inbox: Inbox<W>,
}

impl<W> ChildContext<W> {
    pub(crate) fn new(id: Arc<str>, generation: u64, inbox: Inbox<W>) -> Self {
        Self {
            id,
            generation,
            inbox,
        }
    }

    /// Identifier of the child running this worker.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Spawn generation of this run; distinct for every spawn in the process.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The call/cast inbox of this run.
    ///
    /// If call/cast is disabled for the child the inbox never yields anything.
    pub fn inbox(&mut self) -> &mut Inbox<W> {
        &mut self.inbox
    }

    /// Detaches the inbox, e.g. to move it into a helper future.
    pub fn into_inbox(self) -> Inbox<W> {
        self.inbox
    }
}
