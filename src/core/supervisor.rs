//! # Supervisor: runs an ordered set of children and restarts them.
//!
//! The [`Supervisor`] owns the children (in registration order), the event
//! bus, and the subscriber fan-out. One [`run`](Supervisor::run) at a time
//! spawns every child and then serves the termination queue until a shutdown
//! request arrives.
//!
//! ## High-level architecture
//! ```text
//! run():
//!   children[0].spawn ─► children[1].spawn ─► ... ─► children[N-1].spawn
//!
//! event loop (one entry at a time):
//!   TerminationQueue ──► ChildExited{id, g} ──► child_exited()
//!                    └─► Shutdown           ──► break
//!
//! child_exited(id):
//!   child running again?          → stale, ignore
//!   log termination error
//!   supervisor no longer running? → stale, ignore
//!   child.restart():
//!     ├─ Err(BlownRestartPolicy) → RestartPolicyBlown, enqueue Shutdown
//!     ├─ Ok(false)               → child stays stopped
//!     └─ Ok(true)                → stop siblings (Strategy, reverse order)
//!                                  sleep(restart_delay)
//!                                  spawn affected children still registered
//!                                  (registration order)
//!
//! teardown:
//!   children[N-1].shutdown ─► ... ─► children[0].shutdown ─► SupervisorStopped
//! ```
//!
//! Children with [`RestartMode::Never`] are left alone by sibling cascades.
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use ultravisor::{ChildSpec, LogWriter, Strategy, Supervisor, SupervisorConfig, WorkerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         strategy: Strategy::RestForOne,
//!         ..SupervisorConfig::default()
//!     };
//!
//!     let metrics = ChildSpec::from_fn("metrics", |stop: CancellationToken| async move {
//!         stop.cancelled().await;
//!         Ok::<(), WorkerError>(())
//!     });
//!     let shipper = ChildSpec::from_fn("shipper", |stop: CancellationToken| async move {
//!         while !stop.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(250)).await;
//!         }
//!         Ok::<(), WorkerError>(())
//!     });
//!
//!     let sup = Supervisor::builder(cfg)
//!         .with_child(metrics)?
//!         .with_child(shipper)?
//!         .with_subscribers(vec![std::sync::Arc::new(LogWriter::new())])
//!         .build();
//!
//!     sup.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::core::child::{Child, SupervisedChild};
use crate::core::queue::{QueueEntry, TerminationQueue};
use crate::core::{SupervisorBuilder, SupervisorConfig, shutdown};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::RestartMode;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::{ChildSpec, Worker};

/// State of the active run.
struct RunControl {
    queue: TerminationQueue,
    force: CancellationToken,
    epoch: u64,
    /// Cleared once teardown starts; children added after that are not spawned.
    accepting: bool,
}

/// Supervises an ordered set of children.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    children: tokio::sync::Mutex<Vec<Arc<dyn SupervisedChild>>>,
    control: Mutex<Option<RunControl>>,
    /// Epoch of the active run, `None` when stopped.
    running: watch::Sender<Option<u64>>,
    epochs: AtomicU64,
}

impl Supervisor {
    /// Creates a builder for a supervisor with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subscribers: Vec<Arc<dyn Subscribe>>,
        children: Vec<Arc<dyn SupervisedChild>>,
    ) -> Self {
        let (running, _) = watch::channel(None);
        Self {
            cfg,
            bus,
            subscribers,
            children: tokio::sync::Mutex::new(children),
            control: Mutex::new(None),
            running,
            epochs: AtomicU64::new(0),
        }
    }

    /// The configuration this supervisor was built with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Receiver of every event published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// True while a run loop is active.
    pub fn is_running(&self) -> bool {
        self.running.borrow().is_some()
    }

    fn control(&self) -> MutexGuard<'_, Option<RunControl>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> Option<u64> {
        *self.running.borrow()
    }

    async fn snapshot(&self) -> Vec<Arc<dyn SupervisedChild>> {
        self.children.lock().await.clone()
    }

    /// Registers a child, spawning it right away if the supervisor is running.
    ///
    /// Once teardown has started the child is only registered; the next run spawns it.
    pub async fn add_child<W: Worker>(
        &self,
        spec: ChildSpec<W>,
    ) -> Result<Arc<Child<W>>, RuntimeError> {
        spec.validate()?;
        let mut children = self.children.lock().await;
        if children.iter().any(|c| c.id() == spec.id()) {
            return Err(RuntimeError::DuplicateChild {
                child: Arc::clone(spec.id_arc()),
            });
        }

        let child = Child::new(spec, self.bus.clone());
        children.push(child.clone());

        let queue = self
            .control()
            .as_ref()
            .filter(|c| c.accepting)
            .map(|c| c.queue.clone());
        if let Some(queue) = queue {
            if let Err(err) = child.spawn(&queue) {
                children.pop();
                return Err(err);
            }
        }
        drop(children);

        self.bus
            .publish(Event::new(EventKind::ChildAdded).with_child(child.id()));
        Ok(child)
    }

    /// Removes a child, shutting it down if it runs. Returns false if `id` is unknown.
    pub async fn remove_child(&self, id: &str) -> bool {
        let removed = {
            let mut children = self.children.lock().await;
            let Some(pos) = children.iter().position(|c| c.id() == id) else {
                return false;
            };
            children.remove(pos)
        };
        removed.shutdown(false).await;
        self.bus
            .publish(Event::new(EventKind::ChildRemoved).with_child(id));
        true
    }

    /// Looks a child up by id.
    pub async fn get(&self, id: &str) -> Option<Arc<dyn SupervisedChild>> {
        self.children
            .lock()
            .await
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    /// Looks a child up by id, typed by its worker.
    ///
    /// `None` if the id is unknown or the child runs another worker type.
    pub async fn child<W: Worker>(&self, id: &str) -> Option<Arc<Child<W>>> {
        self.get(id).await?.into_any().downcast::<Child<W>>().ok()
    }

    /// Ids of the registered children, in registration order.
    pub async fn ids(&self) -> Vec<String> {
        self.children
            .lock()
            .await
            .iter()
            .map(|c| c.id().to_string())
            .collect()
    }

    /// Spawns every child in registration order and supervises them until
    /// [`shutdown`](Self::shutdown) is requested or a restart policy is blown.
    ///
    /// Children are stopped in reverse registration order before this returns
    /// (unless the shutdown was forced, which stops them itself). Fails with
    /// [`RuntimeError::AlreadyRunning`] if another run is active; a new run is
    /// accepted once the previous one has exited.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let (queue, mut rx) = TerminationQueue::channel();
        let force = CancellationToken::new();
        let epoch = {
            let mut control = self.control();
            if control.is_some() {
                return Err(RuntimeError::AlreadyRunning);
            }
            let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;
            *control = Some(RunControl {
                queue: queue.clone(),
                force: force.clone(),
                epoch,
                accepting: true,
            });
            self.running.send_replace(Some(epoch));
            epoch
        };
        self.subscriber_listener();
        tracing::info!(epoch, "supervisor starting");

        let children = self.children.lock().await;
        let failure = children.iter().find_map(|child| {
            child.spawn(&queue).err().inspect(|err| {
                tracing::error!(child = child.id(), error = %err, "failed to spawn child");
            })
        });
        drop(children);
        if let Some(err) = failure {
            let snapshot = self.close_registrations().await;
            self.teardown(snapshot, &force, epoch).await;
            return Err(err);
        }

        let forced = tokio::select! {
            biased;
            _ = force.cancelled() => true,
            _ = self.process_events(&mut rx, &queue, epoch) => false,
        };
        if !forced {
            let snapshot = self.close_registrations().await;
            self.teardown(snapshot, &force, epoch).await;
        }
        Ok(())
    }

    /// Runs until the process receives SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere),
    /// then shuts down gracefully.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let run = self.run();
        tokio::pin!(run);

        tokio::select! {
            res = &mut run => return res,
            sig = shutdown::wait_for_shutdown_signal() => match sig {
                Ok(()) => self.request_shutdown(false, false, "signal").await,
                Err(err) => tracing::warn!(error = %err, "cannot listen for shutdown signals"),
            },
        }
        run.await
    }

    /// Stops the supervisor. No-op if it is not running.
    ///
    /// - `force = false`: asks the run loop to exit; it then shuts every child
    ///   down gracefully in reverse order. With `wait`, returns once the run
    ///   loop has exited.
    /// - `force = true`: stops the run loop at once and kills every child in
    ///   reverse order, skipping graceful methods.
    pub async fn shutdown(&self, wait: bool, force: bool) {
        let reason = if force { "force" } else { "graceful" };
        self.request_shutdown(wait, force, reason).await
    }

    async fn request_shutdown(&self, wait: bool, force: bool, reason: &'static str) {
        let Some((queue, force_token, epoch)) = self
            .control()
            .as_ref()
            .map(|c| (c.queue.clone(), c.force.clone(), c.epoch))
        else {
            return;
        };
        tracing::info!(reason, "supervisor shutdown requested");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));

        if force {
            force_token.cancel();
            let children = self.close_registrations().await;
            for child in children.iter().rev() {
                child.shutdown(true).await;
            }
            self.finish(epoch);
            return;
        }

        queue.shutdown();
        if wait {
            let mut rx = self.running.subscribe();
            let _ = rx.wait_for(|running| *running != Some(epoch)).await;
        }
    }

    /// Serves the termination queue until a shutdown entry arrives.
    async fn process_events(
        &self,
        rx: &mut mpsc::UnboundedReceiver<QueueEntry>,
        queue: &TerminationQueue,
        epoch: u64,
    ) {
        while let Some(entry) = rx.recv().await {
            match entry {
                QueueEntry::Shutdown => break,
                QueueEntry::ChildExited { id, generation } => {
                    self.child_exited(&id, generation, queue, epoch).await;
                }
            }
        }
    }

    async fn child_exited(&self, id: &str, generation: u64, queue: &TerminationQueue, epoch: u64) {
        let children = self.snapshot().await;
        let Some(failed) = children.iter().position(|c| c.id() == id) else {
            tracing::debug!(child = id, generation, "termination of a removed child");
            return;
        };
        let child = &children[failed];
        if child.is_running() {
            tracing::debug!(child = id, generation, "stale termination");
            return;
        }

        if let Some(err) = child.termination_error().await {
            tracing::error!(child = id, generation, error = %err, "child terminated with error");
        }
        if self.current_epoch() != Some(epoch) {
            return;
        }

        match child.restart().await {
            Err(err) => {
                tracing::error!(child = id, error = %err, "restart policy blown; shutting down");
                self.bus.publish(
                    Event::new(EventKind::RestartPolicyBlown)
                        .with_child(id)
                        .with_reason(err.to_string()),
                );
                queue.shutdown();
                return;
            }
            Ok(false) => {
                tracing::debug!(child = id, "child not restarted");
                return;
            }
            Ok(true) => {}
        }

        let strategy = self.cfg.strategy;
        let mut respawn = vec![id];
        for i in strategy.siblings_to_stop(failed, children.len()) {
            let sibling = &children[i];
            if sibling.restart_mode() != RestartMode::Never {
                sibling.shutdown(false).await;
                respawn.push(sibling.id());
            }
        }

        let delay = child.restart_delay();
        tracing::debug!(child = id, ?delay, ?strategy, "restarting");
        self.bus.publish(
            Event::new(EventKind::RestartScheduled)
                .with_child(id)
                .with_delay(delay)
                .with_reason(strategy.as_label()),
        );
        tokio::time::sleep(delay).await;

        // Children removed during the delay stay down.
        let current = self.children.lock().await;
        for target in current.iter().filter(|c| respawn.contains(&c.id())) {
            if let Err(err) = target.spawn(queue) {
                tracing::error!(child = target.id(), error = %err, "respawn failed; shutting down");
                queue.shutdown();
                return;
            }
        }
    }

    /// Stops spawning newly added children and returns the ones to tear down.
    async fn close_registrations(&self) -> Vec<Arc<dyn SupervisedChild>> {
        let children = self.children.lock().await;
        if let Some(control) = self.control().as_mut() {
            control.accepting = false;
        }
        children.clone()
    }

    /// Stops `children` in reverse order and marks run `epoch` finished.
    async fn teardown(
        &self,
        children: Vec<Arc<dyn SupervisedChild>>,
        force: &CancellationToken,
        epoch: u64,
    ) {
        for child in children.iter().rev() {
            if force.is_cancelled() {
                return;
            }
            child.shutdown(false).await;
        }
        self.finish(epoch);
    }

    fn finish(&self, epoch: u64) {
        let mut control = self.control();
        if control.as_ref().map(|c| c.epoch) != Some(epoch) {
            return;
        }
        *control = None;
        self.running.send_replace(None);
        drop(control);

        tracing::info!(epoch, "supervisor stopped");
        self.bus.publish(Event::new(EventKind::SupervisorStopped));
    }

    /// Forwards bus events to the subscribers until the run stops (fire-and-forget).
    fn subscriber_listener(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::SupervisorStopped;
                        set.emit(&ev);
                        if last {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::WorkerError;
    use crate::policies::{RestartPolicy, Strategy};
    use crate::workers::ChildContext;

    /// Shared record of what the test workers did.
    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn count(&self, entry: &str) -> usize {
            self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Runs until stopped; the first `failures` runs fail right away.
    fn service(id: &'static str, journal: &Journal, failures: usize) -> ChildSpec<impl Worker> {
        let journal = journal.clone();
        let runs = Arc::new(AtomicUsize::new(0));
        ChildSpec::from_fn(id, move |stop: CancellationToken| {
            let journal = journal.clone();
            let run = runs.fetch_add(1, Ordering::SeqCst);
            async move {
                journal.push(format!("start:{id}"));
                if run < failures {
                    return Err(WorkerError::fail("scripted failure"));
                }
                stop.cancelled().await;
                journal.push(format!("stop:{id}"));
                Ok(())
            }
        })
        .with_policy(RestartPolicy::new(Duration::from_secs(60), 10, Duration::ZERO))
    }

    fn build(strategy: Strategy) -> SupervisorBuilder {
        Supervisor::builder(SupervisorConfig {
            strategy,
            ..SupervisorConfig::default()
        })
    }

    fn start(sup: &Arc<Supervisor>) -> tokio::task::JoinHandle<Result<(), RuntimeError>> {
        let sup = Arc::clone(sup);
        tokio::spawn(async move { sup.run().await })
    }

    async fn eventually(what: &str, cond: impl Fn() -> bool) {
        for _ in 0..300 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    fn drain(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Vec<String> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.kind == kind)
            .filter_map(|e| e.child.as_deref().map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn test_start_in_order_stop_in_reverse() {
        let journal = Journal::default();
        let sup = build(Strategy::OneForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .with_child(service("b", &journal, 0))
            .unwrap()
            .with_child(service("c", &journal, 0))
            .unwrap()
            .build();
        let mut events = sup.events();

        let run = start(&sup);
        eventually("all started", || {
            ["a", "b", "c"]
                .iter()
                .all(|id| journal.count(&format!("start:{id}")) == 1)
        })
        .await;
        assert!(sup.is_running());

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
        assert!(!sup.is_running());

        let stops: Vec<String> = journal
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("stop:"))
            .collect();
        assert_eq!(stops, vec!["stop:c", "stop:b", "stop:a"]);

        let mut starts = Vec::new();
        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::ChildStarting {
                starts.push(ev.child.as_deref().unwrap_or_default().to_string());
            }
            kinds.push(ev.kind);
        }
        assert_eq!(starts, vec!["a", "b", "c"]);
        assert_eq!(kinds.last(), Some(&EventKind::SupervisorStopped));
    }

    #[tokio::test]
    async fn test_one_for_one_restarts_only_the_failed_child() {
        let journal = Journal::default();
        let sup = build(Strategy::OneForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .with_child(service("b", &journal, 1))
            .unwrap()
            .with_child(service("c", &journal, 0))
            .unwrap()
            .build();

        let run = start(&sup);
        eventually("b restarted", || journal.count("start:b") == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(journal.count("start:a"), 1);
        assert_eq!(journal.count("start:c"), 1);
        assert_eq!(journal.count("stop:a") + journal.count("stop:c"), 0);

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_all_for_one_restarts_everyone() {
        let journal = Journal::default();
        let sup = build(Strategy::AllForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .with_child(service("b", &journal, 1))
            .unwrap()
            .with_child(service("c", &journal, 0))
            .unwrap()
            .build();

        let run = start(&sup);
        eventually("everyone restarted", || {
            ["a", "b", "c"]
                .iter()
                .all(|id| journal.count(&format!("start:{id}")) == 2)
        })
        .await;

        let stops: Vec<String> = journal
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("stop:"))
            .collect();
        assert_eq!(stops, vec!["stop:c", "stop:a"]);

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
        for id in ["a", "b", "c"] {
            assert_eq!(journal.count(&format!("start:{id}")), 2, "{id} respawned exactly once");
        }
    }

    #[tokio::test]
    async fn test_rest_for_one_restarts_later_children() {
        let journal = Journal::default();
        let sup = build(Strategy::RestForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .with_child(service("b", &journal, 1))
            .unwrap()
            .with_child(service("c", &journal, 0))
            .unwrap()
            .build();

        let run = start(&sup);
        eventually("b and c restarted", || {
            journal.count("start:b") == 2 && journal.count("start:c") == 2
        })
        .await;
        assert_eq!(journal.count("start:a"), 1);
        assert_eq!(journal.count("stop:a"), 0);
        assert_eq!(journal.count("stop:c"), 1);

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_never_children_are_not_respawned() {
        let journal = Journal::default();
        let sup = build(Strategy::AllForOne)
            .with_child(service("steady", &journal, 0).with_restart(RestartMode::Never))
            .unwrap()
            .with_child(service("once", &journal, 1).with_restart(RestartMode::Never))
            .unwrap()
            .with_child(service("flaky", &journal, 1))
            .unwrap()
            .build();

        let run = start(&sup);
        eventually("flaky restarted", || journal.count("start:flaky") == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(journal.count("start:steady"), 1);
        assert_eq!(journal.count("stop:steady"), 0, "exempt from the cascade");
        assert_eq!(journal.count("start:once"), 1);

        let once = sup.get("once").await.expect("registered");
        assert!(!once.is_running());
        assert!(sup.get("steady").await.expect("registered").is_running());

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_on_failure_ignores_clean_exit() {
        let journal = Journal::default();
        let finisher = {
            let journal = journal.clone();
            ChildSpec::from_fn("finisher", move |_stop: CancellationToken| {
                let journal = journal.clone();
                async move {
                    journal.push("start:finisher".to_string());
                    Ok::<(), WorkerError>(())
                }
            })
            .with_restart(RestartMode::OnFailure)
        };
        let sup = build(Strategy::OneForOne)
            .with_child(finisher)
            .unwrap()
            .with_child(service("crasher", &journal, 1).with_restart(RestartMode::OnFailure))
            .unwrap()
            .build();

        let run = start(&sup);
        eventually("crasher restarted", || journal.count("start:crasher") == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(journal.count("start:finisher"), 1);
        assert!(sup.is_running());

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_blown_policy_stops_the_supervisor() {
        let journal = Journal::default();
        let sup = build(Strategy::OneForOne)
            .with_child(service("bystander", &journal, 0))
            .unwrap()
            .with_child(
                service("doomed", &journal, usize::MAX)
                    .with_policy(RestartPolicy::new(Duration::from_secs(60), 2, Duration::ZERO)),
            )
            .unwrap()
            .build();
        let mut events = sup.events();

        let run = start(&sup);
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("supervisor stopped on its own")
            .unwrap()
            .unwrap();

        assert!(!sup.is_running());
        assert_eq!(journal.count("start:doomed"), 3);
        assert_eq!(journal.count("stop:bystander"), 1);
        assert_eq!(drain(&mut events, EventKind::RestartPolicyBlown), vec!["doomed"]);
    }

    #[tokio::test]
    async fn test_single_run_at_a_time() {
        let journal = Journal::default();
        let sup = build(Strategy::OneForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .build();

        let run = start(&sup);
        eventually("running", || journal.count("start:a") == 1).await;
        let err = sup.run().await.unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyRunning));

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();

        let rerun = start(&sup);
        eventually("running again", || journal.count("start:a") == 2).await;
        sup.shutdown(true, false).await;
        rerun.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_when_idle_is_a_noop() {
        let sup = build(Strategy::OneForOne).build();
        sup.shutdown(true, false).await;
        sup.shutdown(true, true).await;
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected() {
        let journal = Journal::default();
        let err = build(Strategy::OneForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .with_child(service("a", &journal, 0))
            .err()
            .expect("duplicate");
        assert_eq!(err.as_label(), "runtime_duplicate_child");

        let sup = build(Strategy::OneForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .build();
        let err = sup.add_child(service("a", &journal, 0)).await.err();
        assert!(matches!(err, Some(RuntimeError::DuplicateChild { .. })));
        assert_eq!(sup.ids().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_add_and_remove_while_running() {
        let journal = Journal::default();
        let sup = build(Strategy::OneForOne)
            .with_child(service("a", &journal, 0))
            .unwrap()
            .build();
        let run = start(&sup);
        eventually("a started", || journal.count("start:a") == 1).await;

        let late = sup.add_child(service("late", &journal, 0)).await.unwrap();
        eventually("late started", || journal.count("start:late") == 1).await;
        assert!(late.is_running());
        assert_eq!(sup.ids().await, vec!["a", "late"]);

        assert!(sup.remove_child("late").await);
        assert!(!late.is_running());
        assert_eq!(journal.count("stop:late"), 1);
        assert!(sup.get("late").await.is_none());
        assert!(!sup.remove_child("late").await);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(journal.count("start:late"), 1, "removed child is not restarted");

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_child_added_during_teardown_is_not_spawned() {
        let journal = Journal::default();
        let tearing_down = Arc::new(AtomicBool::new(false));
        let slow = {
            let tearing_down = Arc::clone(&tearing_down);
            service("slow", &journal, 0)
                .with_shutdown_method(move |_| tearing_down.store(true, Ordering::SeqCst))
                .with_shutdown_timeout(Duration::from_millis(500))
        };
        let sup = build(Strategy::OneForOne).with_child(slow).unwrap().build();
        let run = start(&sup);
        eventually("slow started", || journal.count("start:slow") == 1).await;

        sup.shutdown(false, false).await;
        eventually("teardown started", || tearing_down.load(Ordering::SeqCst)).await;
        let late = sup.add_child(service("late", &journal, 0)).await.unwrap();

        run.await.unwrap().unwrap();
        assert!(!sup.is_running());
        assert!(!late.is_running());
        assert_eq!(journal.count("start:late"), 0);
        assert_eq!(sup.ids().await, vec!["slow", "late"]);

        let rerun = start(&sup);
        eventually("late spawned by the next run", || journal.count("start:late") == 1).await;
        sup.shutdown(true, false).await;
        rerun.await.unwrap().unwrap();
        assert!(!late.is_running());
    }

    #[tokio::test]
    async fn test_child_removed_during_restart_delay_stays_down() {
        let journal = Journal::default();
        let flaky = service("flaky", &journal, usize::MAX).with_policy(RestartPolicy::new(
            Duration::from_secs(60),
            100,
            Duration::from_millis(500),
        ));
        let sup = build(Strategy::AllForOne)
            .with_child(service("victim", &journal, 0))
            .unwrap()
            .with_child(flaky)
            .unwrap()
            .build();
        let victim = sup.get("victim").await.expect("registered");
        let run = start(&sup);

        eventually("cascade stopped victim", || journal.count("stop:victim") == 1).await;
        assert!(sup.remove_child("victim").await);

        eventually("flaky respawned", || journal.count("start:flaky") == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!victim.is_running());
        assert_eq!(journal.count("start:victim"), 1);
        assert_eq!(sup.ids().await, vec!["flaky"]);

        sup.shutdown(true, true).await;
        run.await.unwrap().unwrap();
        assert!(!victim.is_running());
    }

    #[tokio::test]
    async fn test_force_shutdown_does_not_wait_for_graceful_methods() {
        let journal = Journal::default();
        let stubborn = service("stubborn", &journal, 0)
            .with_shutdown_method(|_| {})
            .with_shutdown_timeout(Duration::from_secs(30));
        let sup = build(Strategy::OneForOne)
            .with_child(stubborn)
            .unwrap()
            .build();
        let run = start(&sup);
        eventually("started", || journal.count("start:stubborn") == 1).await;

        let started = std::time::Instant::now();
        sup.shutdown(true, true).await;
        run.await.unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!sup.is_running());
        assert!(!sup.get("stubborn").await.unwrap().is_running());
    }

    struct Greeter {
        stop: CancellationToken,
    }

    #[async_trait]
    impl Worker for Greeter {
        type Output = ();

        async fn run(self: Arc<Self>, mut ctx: ChildContext<Self>) -> Result<(), WorkerError> {
            tokio::select! {
                _ = self.stop.cancelled() => {}
                _ = ctx.inbox().process_loop(&self) => {}
            }
            Ok(())
        }
    }

    struct Mute;

    #[async_trait]
    impl Worker for Mute {
        type Output = ();

        async fn run(self: Arc<Self>, _ctx: ChildContext<Self>) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_typed_lookup_and_call() {
        let spec = ChildSpec::new("greeter", || Greeter {
            stop: CancellationToken::new(),
        })
        .with_castcall(true)
        .with_shutdown_method(|g: &Greeter| g.stop.cancel());
        let sup = build(Strategy::OneForOne).with_child(spec).unwrap().build();
        let run = start(&sup);

        assert!(sup.child::<Mute>("greeter").await.is_none(), "wrong worker type");
        let greeter = sup.child::<Greeter>("greeter").await.expect("typed child");
        let hello = greeter
            .call(|_: &Greeter| format!("hello from {:?}", std::thread::current().name()))
            .await
            .unwrap();
        assert_eq!(hello, "hello from Some(\"greeter\")");

        sup.shutdown(true, false).await;
        run.await.unwrap().unwrap();
        assert!(sup.child::<Greeter>("missing").await.is_none());
    }
}
