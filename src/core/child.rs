//! # Child: one worker's lifecycle.
//!
//! A [`Child`] owns everything about one registered worker across restarts:
//! its spec, the live instance while a generation runs, the termination value
//! or error of the last run, and the runtime history used by the restart policy.
//!
//! ## Lifecycle
//! ```text
//! Idle ──spawn()──► Running(generation g) ──worker returns / fails / killed──► Idle
//!                        │                                         ▲
//!                        └──shutdown(force)──► Terminating ────────┘
//! ```
//! - `spawn` builds a fresh instance, takes a new generation and starts a named
//!   OS thread running a current-thread tokio runtime that drives [`Worker::run`].
//! - Killing a generation cancels its kill token: the worker future is dropped
//!   at its next await point. A worker stuck in blocking code ignores that;
//!   after a short grace the shutdown path runs the cleanup itself and the OS
//!   thread is abandoned.
//! - Cleanup runs once per generation, whichever path gets there first: it is
//!   keyed on the generation and serialized by the child's state lock, so a late
//!   cleanup from a superseded thread never touches a newer generation.
//!
//! ## Cleanup
//! ```text
//! take Running(g) ─► record value/error ─► record elapsed run in history
//!                 ─► close inbox (pending calls fail with ChildRestarted)
//!                 ─► drop instance ─► live = None (wakes wait/call/unsafe_instance)
//!                 ─► publish ChildStopped / ChildFailed / ChildKilled
//!                 ─► unless shutting down: push ChildExited{id, g} onto the queue
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::core::inbox::{self, InboxSender, Job};
use crate::core::queue::TerminationQueue;
use crate::error::{RuntimeError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RestartMode, RuntimeHistory};
use crate::workers::{Access, ChildContext, ChildSpec, Worker};

/// How long a killed thread gets to unwind before it is abandoned.
const ABANDON_GRACE: Duration = Duration::from_millis(100);

static GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// How one generation ended.
enum Outcome<T> {
    Value(T),
    Failed(WorkerError),
    Killed,
}

/// Bookkeeping of the generation currently running.
struct Running<W: Worker> {
    generation: u64,
    instance: Arc<W>,
    inbox: Option<InboxSender<W>>,
    kill: CancellationToken,
    thread: ThreadId,
    started_at: Instant,
}

struct State<W: Worker> {
    running: Option<Running<W>>,
    value: Option<W::Output>,
    error: Option<WorkerError>,
    history: RuntimeHistory,
    shutting_down: bool,
}

/// A supervised worker and its lifecycle.
///
/// Obtained from [`Supervisor::child`](crate::Supervisor::child). All methods
/// take `&self` and may be used from any thread.
pub struct Child<W: Worker> {
    me: Weak<Child<W>>,
    spec: ChildSpec<W>,
    bus: Bus,
    state: Mutex<State<W>>,
    /// Generation currently running, `None` when idle.
    live: watch::Sender<Option<u64>>,
}

impl<W: Worker> Child<W> {
    pub(crate) fn new(spec: ChildSpec<W>, bus: Bus) -> Arc<Self> {
        let history = RuntimeHistory::with_capacity(spec.policy().history_capacity());
        let (live, _) = watch::channel(None);
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            spec,
            bus,
            state: Mutex::new(State {
                running: None,
                value: None,
                error: None,
                history,
                shutting_down: false,
            }),
            live,
        })
    }

    /// Identifier of the child.
    pub fn id(&self) -> &str {
        self.spec.id()
    }

    /// The spec the child was registered with.
    pub fn spec(&self) -> &ChildSpec<W> {
        &self.spec
    }

    /// True while a generation is running.
    pub fn is_running(&self) -> bool {
        self.live.borrow().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, State<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new generation on its own thread. No-op if one is running.
    ///
    /// Termination of the generation is reported on `queue` unless the child
    /// is being shut down.
    pub fn spawn(&self, queue: &TerminationQueue) -> Result<&Self, RuntimeError> {
        let mut state = self.lock();
        if state.running.is_some() {
            return Ok(self);
        }

        let id = Arc::clone(self.spec.id_arc());
        let generation = next_generation();
        let instance = Arc::new(self.spec.instantiate());
        let (sender, inbox) = inbox::channel(self.spec.castcall());
        let kill = CancellationToken::new();

        let ctx = ChildContext::new(Arc::clone(&id), generation, inbox);
        let thread_instance = Arc::clone(&instance);
        let thread_kill = kill.clone();
        let me = self.me.clone();
        let queue = queue.clone();

        let handle = std::thread::Builder::new()
            .name(id.to_string())
            .spawn(move || {
                let mut guard = CleanupGuard {
                    child: me,
                    generation,
                    queue,
                    outcome: None,
                };
                guard.outcome = Some(drive(thread_instance, ctx, thread_kill));
            })
            .map_err(|source| RuntimeError::Spawn {
                child: Arc::clone(&id),
                source,
            })?;

        state.running = Some(Running {
            generation,
            instance,
            inbox: sender,
            kill,
            thread: handle.thread().id(),
            started_at: Instant::now(),
        });
        state.value = None;
        state.error = None;
        state.shutting_down = false;
        tracing::debug!(child = %id, generation, "child spawned");
        self.bus.publish(
            Event::new(EventKind::ChildStarting)
                .with_child(id)
                .with_generation(generation),
        );
        self.live.send_replace(Some(generation));
        drop(state);
        Ok(self)
    }

    /// Stops the running generation.
    ///
    /// Without `force`, the graceful shutdown method (if configured) is invoked
    /// on the live instance; otherwise the worker is killed. Either way the
    /// worker gets the configured timeout to finish, is killed if it has not,
    /// and is abandoned (cleanup done here) if it still has not after a short
    /// grace. No-op when idle or when called from the worker's own thread.
    pub async fn shutdown(&self, force: bool) {
        let (generation, instance, kill) = {
            let mut state = self.lock();
            let Some(running) = state.running.as_ref() else {
                return;
            };
            if running.thread == std::thread::current().id() {
                tracing::debug!(child = self.id(), "ignoring shutdown from the child's own thread");
                return;
            }
            let taken = (
                running.generation,
                Arc::clone(&running.instance),
                running.kill.clone(),
            );
            state.shutting_down = true;
            taken
        };

        match self.spec.shutdown().method() {
            Some(method) if !force => {
                let graceful = std::panic::catch_unwind(AssertUnwindSafe(|| method(&instance)));
                if let Err(payload) = graceful {
                    let err = WorkerError::from_panic(payload.as_ref());
                    tracing::warn!(child = self.id(), error = %err, "shutdown method panicked; killing");
                    kill.cancel();
                }
            }
            _ => kill.cancel(),
        }
        drop(instance);

        let timeout = self.spec.shutdown().timeout();
        if self.wait_generation(generation, timeout).await {
            return;
        }

        tracing::warn!(child = self.id(), generation, ?timeout, "child did not stop in time; killing");
        self.bus.publish(
            Event::new(EventKind::ShutdownTimeout)
                .with_child(self.id())
                .with_generation(generation)
                .with_timeout(timeout),
        );
        kill.cancel();
        if self.wait_generation(generation, ABANDON_GRACE).await {
            return;
        }

        tracing::error!(child = self.id(), generation, "child thread ignored kill; abandoning it");
        self.bus.publish(
            Event::new(EventKind::ThreadAbandoned)
                .with_child(self.id())
                .with_generation(generation),
        );
        self.terminate(generation, Outcome::Killed, None);
    }

    /// Waits up to `limit` for `generation` to be cleaned up.
    async fn wait_generation(&self, generation: u64, limit: Duration) -> bool {
        let mut rx = self.live.subscribe();
        tokio::time::timeout(limit, rx.wait_for(|g| *g != Some(generation)))
            .await
            .is_ok()
    }

    /// Waits until no generation is running.
    pub async fn wait(&self) -> &Self {
        let mut rx = self.live.subscribe();
        let _ = rx.wait_for(Option::is_none).await;
        self
    }

    /// Waits for the running generation to end and returns its value, if it
    /// returned cleanly.
    pub async fn termination_value(&self) -> Option<W::Output> {
        self.wait().await;
        self.lock().value.clone()
    }

    /// Waits for the running generation to end and returns its error, if it failed.
    pub async fn termination_error(&self) -> Option<WorkerError> {
        self.wait().await;
        self.lock().error.clone()
    }

    /// Waits for the running generation to end, then decides whether to restart.
    ///
    /// Fails with [`RuntimeError::BlownRestartPolicy`] if the child terminated
    /// more often than its restart policy allows; otherwise applies the restart mode.
    pub async fn restart(&self) -> Result<bool, RuntimeError> {
        self.wait().await;
        let mut state = self.lock();
        let policy = self.spec.policy();
        if policy.is_blown(&mut state.history) {
            return Err(RuntimeError::BlownRestartPolicy {
                child: Arc::clone(self.spec.id_arc()),
                max: policy.max,
                period: policy.period,
            });
        }
        Ok(self.spec.restart().wants_restart(state.error.is_some()))
    }

    /// Draws the pause to take before respawning.
    pub fn restart_delay(&self) -> Duration {
        self.spec.policy().restart_delay()
    }

    /// Direct access to the live instance, bypassing call/cast.
    ///
    /// Only for children declared [`Access::Unsafe`]; waits until an instance exists.
    pub async fn unsafe_instance(&self) -> Result<Arc<W>, RuntimeError> {
        if self.spec.access() != Access::Unsafe {
            return Err(RuntimeError::ThreadSafety {
                child: Arc::clone(self.spec.id_arc()),
                reason: "instance access requires Access::Unsafe",
            });
        }
        Ok(self
            .when_running(|running| Arc::clone(&running.instance))
            .await)
    }

    /// Runs `f` on the worker's own thread and returns its result.
    ///
    /// Waits for a running instance first. Fails with
    /// [`RuntimeError::ChildRestarted`] if the generation terminates before the
    /// call is serviced (or while servicing it).
    pub async fn call<R, F>(&self, f: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&W) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.ensure_castcall()?;
        let Some(sender) = self.when_running(|running| running.inbox.clone()).await else {
            return Err(self.restarted());
        };

        let (tx, rx) = oneshot::channel();
        let job: Job<W> = Box::new(move |worker: &W| {
            let _ = tx.send(f(worker));
        });
        if !sender.send(job) {
            return Err(self.restarted());
        }

        tokio::select! {
            biased;
            res = rx => res.map_err(|_| self.restarted()),
            _ = sender.closed().cancelled() => Err(self.restarted()),
        }
    }

    /// Queues `f` to run on the worker's own thread and returns immediately.
    ///
    /// Silently dropped if no generation is running.
    pub fn cast<F>(&self, f: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(&W) + Send + 'static,
    {
        self.ensure_castcall()?;
        let sender = self
            .lock()
            .running
            .as_ref()
            .and_then(|running| running.inbox.clone());
        if let Some(sender) = sender {
            sender.send(Box::new(f));
        }
        Ok(())
    }

    fn ensure_castcall(&self) -> Result<(), RuntimeError> {
        if self.spec.castcall() {
            Ok(())
        } else {
            Err(RuntimeError::CastCallDisabled {
                child: Arc::clone(self.spec.id_arc()),
            })
        }
    }

    fn restarted(&self) -> RuntimeError {
        RuntimeError::ChildRestarted {
            child: Arc::clone(self.spec.id_arc()),
        }
    }

    /// Waits for a running generation and extracts something from it.
    async fn when_running<T>(&self, f: impl Fn(&Running<W>) -> T) -> T {
        let mut rx = self.live.subscribe();
        loop {
            let found = self.lock().running.as_ref().map(&f);
            if let Some(found) = found {
                return found;
            }
            let _ = rx.wait_for(Option::is_some).await;
        }
    }

    /// Cleans up `generation` if it is still the running one.
    ///
    /// Notifies `queue` unless the child is shutting down.
    fn terminate(
        &self,
        generation: u64,
        outcome: Outcome<W::Output>,
        queue: Option<&TerminationQueue>,
    ) {
        let mut state = self.lock();
        let Some(running) = state
            .running
            .take_if(|running| running.generation == generation)
        else {
            return;
        };

        let kind = match outcome {
            Outcome::Value(value) => {
                state.value = Some(value);
                EventKind::ChildStopped
            }
            Outcome::Failed(err) => {
                state.error = Some(err);
                EventKind::ChildFailed
            }
            Outcome::Killed => EventKind::ChildKilled,
        };
        state.history.record(running.started_at.elapsed());
        let reason = state.error.as_ref().map(ToString::to_string);
        let notify = !state.shutting_down;

        if let Some(inbox) = &running.inbox {
            inbox.close();
        }
        drop(running);

        let id = Arc::clone(self.spec.id_arc());
        tracing::debug!(child = %id, generation, ?kind, "child terminated");
        let mut ev = Event::new(kind)
            .with_child(Arc::clone(&id))
            .with_generation(generation);
        if let Some(reason) = reason.filter(|_| kind == EventKind::ChildFailed) {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);

        self.live.send_replace(None);
        drop(state);

        if let (true, Some(queue)) = (notify, queue) {
            queue.child_exited(id, generation);
        }
    }
}

/// Runs one generation to completion on the current (dedicated) thread.
fn drive<W: Worker>(
    instance: Arc<W>,
    ctx: ChildContext<W>,
    kill: CancellationToken,
) -> Outcome<W::Output> {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => return Outcome::Failed(WorkerError::fail(format!("worker runtime: {err}"))),
    };

    rt.block_on(async move {
        tokio::select! {
            biased;
            _ = kill.cancelled() => Outcome::Killed,
            res = AssertUnwindSafe(W::run(instance, ctx)).catch_unwind() => match res {
                Ok(Ok(value)) => Outcome::Value(value),
                Ok(Err(err)) => Outcome::Failed(err),
                Err(payload) => Outcome::Failed(WorkerError::from_panic(payload.as_ref())),
            },
        }
    })
}

/// Runs the cleanup of its generation when the worker thread finishes,
/// including by unwinding.
struct CleanupGuard<W: Worker> {
    child: Weak<Child<W>>,
    generation: u64,
    queue: TerminationQueue,
    outcome: Option<Outcome<W::Output>>,
}

impl<W: Worker> Drop for CleanupGuard<W> {
    fn drop(&mut self) {
        let Some(child) = self.child.upgrade() else {
            return;
        };
        let outcome = self.outcome.take().unwrap_or_else(|| {
            Outcome::Failed(WorkerError::Panicked {
                info: "worker thread unwound outside the worker".to_string(),
            })
        });
        child.terminate(self.generation, outcome, Some(&self.queue));
    }
}

/// Type-erased view of a [`Child`], as held by the supervisor.
#[async_trait]
pub trait SupervisedChild: Send + Sync + 'static {
    /// Identifier of the child.
    fn id(&self) -> &str;

    /// Restart mode from the child's spec.
    fn restart_mode(&self) -> RestartMode;

    /// True while a generation is running.
    fn is_running(&self) -> bool;

    /// See [`Child::spawn`].
    fn spawn(&self, queue: &TerminationQueue) -> Result<(), RuntimeError>;

    /// See [`Child::shutdown`].
    async fn shutdown(&self, force: bool);

    /// See [`Child::wait`].
    async fn wait(&self);

    /// See [`Child::termination_error`].
    async fn termination_error(&self) -> Option<WorkerError>;

    /// See [`Child::restart`].
    async fn restart(&self) -> Result<bool, RuntimeError>;

    /// See [`Child::restart_delay`].
    fn restart_delay(&self) -> Duration;

    /// Upcast used for typed lookups.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[async_trait]
impl<W: Worker> SupervisedChild for Child<W> {
    fn id(&self) -> &str {
        Child::id(self)
    }

    fn restart_mode(&self) -> RestartMode {
        self.spec.restart()
    }

    fn is_running(&self) -> bool {
        Child::is_running(self)
    }

    fn spawn(&self, queue: &TerminationQueue) -> Result<(), RuntimeError> {
        Child::spawn(self, queue).map(|_| ())
    }

    async fn shutdown(&self, force: bool) {
        Child::shutdown(self, force).await
    }

    async fn wait(&self) {
        Child::wait(self).await;
    }

    async fn termination_error(&self) -> Option<WorkerError> {
        Child::termination_error(self).await
    }

    async fn restart(&self) -> Result<bool, RuntimeError> {
        Child::restart(self).await
    }

    fn restart_delay(&self) -> Duration {
        Child::restart_delay(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
