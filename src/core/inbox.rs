//! # Call/cast bridge.
//!
//! A child with call/cast enabled owns a per-generation inbox: an unbounded
//! queue of jobs (closures over `&W`) plus a `closed` token. Other threads push
//! jobs through [`Child::call`](crate::Child::call) and
//! [`Child::cast`](crate::Child::cast); the worker's own thread executes them
//! when it drains its [`Inbox`], so worker state is only touched by that thread.
//!
//! ```text
//! caller thread                         worker thread
//!   call(f) ──► [job + oneshot] ──► Inbox ──► select! { inbox.recv(), own I/O }
//!      ▲                                          │
//!      └──────────── result ◄─────────────────────┘ envelope.go(&worker)
//! ```
//!
//! When the generation terminates the inbox is closed: queued jobs are dropped,
//! which fails every pending `call` with `ChildRestarted` instead of leaving
//! the caller waiting.

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) type Job<W> = Box<dyn FnOnce(&W) + Send>;

/// One queued invocation, to be run on the worker's thread.
pub struct Envelope<W> {
    job: Job<W>,
}

impl<W> Envelope<W> {
    /// Runs the invocation against the worker.
    pub fn go(self, worker: &W) {
        (self.job)(worker)
    }
}

impl<W> fmt::Debug for Envelope<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Envelope")
    }
}

/// Sending half, kept by the child while the generation runs.
pub(crate) struct InboxSender<W> {
    tx: mpsc::UnboundedSender<Job<W>>,
    closed: CancellationToken,
}

impl<W> Clone for InboxSender<W> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<W> InboxSender<W> {
    /// Queues a job; false if the inbox is already closed.
    pub(crate) fn send(&self, job: Job<W>) -> bool {
        !self.closed.is_cancelled() && self.tx.send(job).is_ok()
    }

    pub(crate) fn close(&self) {
        self.closed.cancel();
    }

    pub(crate) fn closed(&self) -> &CancellationToken {
        &self.closed
    }
}

/// Receiving half, handed to the worker through its
/// [`ChildContext`](crate::ChildContext).
pub struct Inbox<W> {
    rx: Option<mpsc::UnboundedReceiver<Job<W>>>,
    closed: CancellationToken,
}

impl<W> fmt::Debug for Inbox<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("enabled", &self.rx.is_some())
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

/// Creates the inbox of one generation. Without call/cast there is no sender
/// and the receiving half never yields.
pub(crate) fn channel<W>(enabled: bool) -> (Option<InboxSender<W>>, Inbox<W>) {
    let closed = CancellationToken::new();
    if !enabled {
        return (None, Inbox { rx: None, closed });
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = InboxSender {
        tx,
        closed: closed.clone(),
    };
    (
        Some(sender),
        Inbox {
            rx: Some(rx),
            closed,
        },
    )
}

impl<W> Inbox<W> {
    /// Waits for the next envelope; `None` once the inbox is closed.
    ///
    /// Cancel-safe, meant to sit in a `select!` next to the worker's own I/O.
    pub async fn recv(&mut self) -> Option<Envelope<W>> {
        let Some(rx) = self.rx.as_mut() else {
            self.closed.cancelled().await;
            return None;
        };
        tokio::select! {
            biased;
            job = rx.recv() => job.map(|job| Envelope { job }),
            _ = self.closed.cancelled() => None,
        }
    }

    /// Runs every queued envelope without waiting; returns how many ran.
    pub fn process(&mut self, worker: &W) -> usize {
        let Some(rx) = self.rx.as_mut() else {
            return 0;
        };
        let mut ran = 0;
        while let Ok(job) = rx.try_recv() {
            Envelope { job }.go(worker);
            ran += 1;
        }
        ran
    }

    /// Serves envelopes until the inbox closes.
    pub async fn process_loop(&mut self, worker: &W) {
        while let Some(envelope) = self.recv().await {
            envelope.go(worker);
        }
    }

    /// True if call/cast is enabled for this child.
    pub fn is_enabled(&self) -> bool {
        self.rx.is_some()
    }

    /// True once the generation owning this inbox has terminated.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tally(AtomicUsize);

    fn bump(n: usize) -> Job<Tally> {
        Box::new(move |t: &Tally| {
            t.0.fetch_add(n, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_process_drains_without_blocking() {
        let (tx, mut inbox) = channel::<Tally>(true);
        let tx = tx.expect("enabled");
        let tally = Tally::default();

        assert_eq!(inbox.process(&tally), 0);
        assert!(tx.send(bump(1)));
        assert!(tx.send(bump(2)));
        assert_eq!(inbox.process(&tally), 2);
        assert_eq!(tally.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_closed_inbox_refuses_jobs() {
        let (tx, inbox) = channel::<Tally>(true);
        let tx = tx.expect("enabled");
        tx.close();
        assert!(!tx.send(bump(1)));
        assert!(inbox.is_closed());
    }

    #[tokio::test]
    async fn test_recv_ends_when_closed() {
        let (tx, mut inbox) = channel::<Tally>(true);
        let tx = tx.expect("enabled");
        let tally = Tally::default();

        assert!(tx.send(bump(5)));
        let envelope = inbox.recv().await.expect("queued envelope");
        envelope.go(&tally);

        tx.close();
        assert!(inbox.recv().await.is_none());
        assert_eq!(tally.0.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_disabled_inbox_is_inert() {
        let (tx, mut inbox) = channel::<Tally>(false);
        assert!(tx.is_none());
        assert!(!inbox.is_enabled());
        assert_eq!(inbox.process(&Tally::default()), 0);

        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), inbox.recv()).await;
        assert!(pending.is_err(), "disabled inbox must not yield");
    }
}
