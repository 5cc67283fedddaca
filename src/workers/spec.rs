//! # Child specification.
//!
//! [`ChildSpec`] describes everything the supervisor needs to run one child:
//! - how to build a worker instance (the factory, capturing its arguments)
//! - when to restart it ([`RestartMode`]) and how often that may happen ([`RestartPolicy`])
//! - how to stop it ([`ShutdownSpec`]: optional graceful method + timeout)
//! - whether outsiders may touch the instance ([`Access`]) and whether call/cast is enabled
//!
//! A spec can be created:
//! - **Explicitly** with [`ChildSpec::new`] and the `with_*` setters
//! - **From config** with [`ChildSpec::with_defaults`] (inherit supervisor defaults)
//! - **From a closure** with [`ChildSpec::from_fn`]
//! - **Fluently** with [`ChildSpecBuilder`](crate::ChildSpecBuilder)
//!
//! ## Rules
//! - The entry point is [`Worker::run`]: it exists and takes no extra arguments by construction.
//! - Everything else is checked by [`ChildSpec::validate`] when the child is registered,
//!   never at spawn time.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::SupervisorConfig;
use crate::error::{RuntimeError, WorkerError};
use crate::policies::{RestartMode, RestartPolicy};
use crate::workers::{Worker, WorkerFn};

type Factory<W> = Arc<dyn Fn() -> W + Send + Sync>;
type Method<W> = Arc<dyn Fn(&W) + Send + Sync>;

/// Whether code outside the worker's own thread may hold the live instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Access {
    /// Only call/cast reach the instance (default).
    #[default]
    Managed,
    /// [`Child::unsafe_instance`](crate::Child::unsafe_instance) hands out the instance.
    Unsafe,
}

/// How a running child is asked to stop.
pub struct ShutdownSpec<W> {
    method: Option<Method<W>>,
    timeout: Duration,
}

impl<W> ShutdownSpec<W> {
    /// No graceful method: stopping kills the worker.
    pub fn kill(timeout: Duration) -> Self {
        Self {
            method: None,
            timeout,
        }
    }

    /// Graceful `method`, invoked on the live instance; then wait up to `timeout`.
    ///
    /// The method must only *signal* the worker to exit, not wait for it.
    pub fn graceful<M>(method: M, timeout: Duration) -> Self
    where
        M: Fn(&W) + Send + Sync + 'static,
    {
        Self {
            method: Some(Arc::new(method)),
            timeout,
        }
    }

    /// The graceful method, if any.
    pub(crate) fn method(&self) -> Option<&Method<W>> {
        self.method.as_ref()
    }

    /// True if a graceful method is configured.
    pub fn is_graceful(&self) -> bool {
        self.method.is_some()
    }

    /// How long to wait for the worker to stop before killing it.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<W> Default for ShutdownSpec<W> {
    /// No graceful method, one second timeout.
    fn default() -> Self {
        Self::kill(Duration::from_secs(1))
    }
}

impl<W> Clone for ShutdownSpec<W> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            timeout: self.timeout,
        }
    }
}

impl<W> fmt::Debug for ShutdownSpec<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSpec")
            .field("graceful", &self.method.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Specification for running a worker as a supervised child.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use ultravisor::{ChildContext, ChildSpec, RestartMode, RestartPolicy, Worker, WorkerError};
///
/// struct Shipper {
///     endpoint: String,
/// }
///
/// #[async_trait]
/// impl Worker for Shipper {
///     type Output = ();
///     async fn run(self: Arc<Self>, _ctx: ChildContext<Self>) -> Result<(), WorkerError> {
///         Err(WorkerError::fail(format!("{} unreachable", self.endpoint)))
///     }
/// }
///
/// let spec = ChildSpec::new("shipper", || Shipper { endpoint: "http://logs".into() })
///     .with_restart(RestartMode::OnFailure)
///     .with_policy(RestartPolicy::new(Duration::from_secs(10), 5, Duration::from_millis(200)))
///     .with_castcall(true);
/// assert!(spec.validate().is_ok());
/// ```
pub struct ChildSpec<W: Worker> {
    id: Arc<str>,
    factory: Factory<W>,
    restart: RestartMode,
    policy: RestartPolicy,
    shutdown: ShutdownSpec<W>,
    access: Access,
    castcall: bool,
}

impl<W: Worker> Clone for ChildSpec<W> {
    fn clone(&self) -> Self {
        Self {
            id: Arc::clone(&self.id),
            factory: Arc::clone(&self.factory),
            restart: self.restart,
            policy: self.policy.clone(),
            shutdown: self.shutdown.clone(),
            access: self.access,
            castcall: self.castcall,
        }
    }
}

impl<W: Worker> fmt::Debug for ChildSpec<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("restart", &self.restart)
            .field("policy", &self.policy)
            .field("shutdown", &self.shutdown)
            .field("access", &self.access)
            .field("castcall", &self.castcall)
            .finish_non_exhaustive()
    }
}

impl<W: Worker> ChildSpec<W> {
    /// Creates a spec with default restart mode, policy and shutdown.
    ///
    /// `factory` is called on every spawn to build a fresh instance.
    pub fn new<F>(id: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn() -> W + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            factory: Arc::new(factory),
            restart: RestartMode::default(),
            policy: RestartPolicy::default(),
            shutdown: ShutdownSpec::default(),
            access: Access::default(),
            castcall: false,
        }
    }

    /// Creates a spec inheriting restart mode, policy and shutdown timeout from `cfg`.
    pub fn with_defaults<F>(id: impl Into<Arc<str>>, factory: F, cfg: &SupervisorConfig) -> Self
    where
        F: Fn() -> W + Send + Sync + 'static,
    {
        Self::new(id, factory)
            .with_restart(cfg.restart)
            .with_policy(cfg.restart_policy.clone())
            .with_shutdown(ShutdownSpec::kill(cfg.shutdown_timeout))
    }

    /// Identifier of the child.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> &Arc<str> {
        &self.id
    }

    /// Builds a fresh worker instance.
    pub(crate) fn instantiate(&self) -> W {
        (self.factory)()
    }

    /// Returns the restart mode.
    pub fn restart(&self) -> RestartMode {
        self.restart
    }

    /// Returns the restart policy.
    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Returns the shutdown spec.
    pub fn shutdown(&self) -> &ShutdownSpec<W> {
        &self.shutdown
    }

    /// Returns the access mode.
    pub fn access(&self) -> Access {
        self.access
    }

    /// True if call/cast is enabled.
    pub fn castcall(&self) -> bool {
        self.castcall
    }

    /// Returns a new spec with updated restart mode.
    pub fn with_restart(mut self, restart: RestartMode) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with updated restart policy.
    pub fn with_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns a new spec with updated shutdown spec.
    pub fn with_shutdown(mut self, shutdown: ShutdownSpec<W>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Sets the graceful shutdown method, keeping the current timeout.
    pub fn with_shutdown_method<M>(mut self, method: M) -> Self
    where
        M: Fn(&W) + Send + Sync + 'static,
    {
        self.shutdown = ShutdownSpec::graceful(method, self.shutdown.timeout);
        self
    }

    /// Sets the shutdown timeout, keeping the current method.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown.timeout = timeout;
        self
    }

    /// Returns a new spec with updated access mode.
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Enables or disables call/cast.
    pub fn with_castcall(mut self, enabled: bool) -> Self {
        self.castcall = enabled;
        self
    }

    /// Checks the spec; called on registration.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.id.trim().is_empty() {
            return Err(RuntimeError::invalid_spec(&self.id, "child id must not be empty"));
        }
        self.policy
            .validate()
            .map_err(|reason| RuntimeError::invalid_spec(&self.id, reason))
    }
}

impl<F, Fut> ChildSpec<WorkerFn<F>>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    /// Creates a spec running a closure; its graceful shutdown method cancels
    /// the token handed to the closure.
    pub fn from_fn(id: impl Into<Arc<str>>, f: F) -> Self {
        let f = Arc::new(f);
        ChildSpec::new(id, move || WorkerFn::new(Arc::clone(&f)))
            .with_shutdown_method(|w: &WorkerFn<F>| w.stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::RestartDelay;
    use crate::workers::ChildContext;
    use async_trait::async_trait;

    struct Idle;

    #[async_trait]
    impl Worker for Idle {
        type Output = ();
        async fn run(self: Arc<Self>, _ctx: ChildContext<Self>) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    fn noop() -> ChildSpec<impl Worker> {
        ChildSpec::from_fn("noop", |_stop: CancellationToken| async { Ok::<(), WorkerError>(()) })
    }

    #[test]
    fn test_defaults() {
        let spec = noop();
        assert_eq!(spec.restart(), RestartMode::Always);
        assert_eq!(spec.policy(), &RestartPolicy::default());
        assert_eq!(spec.shutdown().timeout(), Duration::from_secs(1));
        assert!(spec.shutdown().is_graceful());
        assert_eq!(spec.access(), Access::Managed);
        assert!(!spec.castcall());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_inherits_config() {
        let cfg = SupervisorConfig {
            restart: RestartMode::Never,
            shutdown_timeout: Duration::from_millis(300),
            ..SupervisorConfig::default()
        };
        let spec = ChildSpec::with_defaults("w", || Idle, &cfg);
        assert_eq!(spec.restart(), RestartMode::Never);
        assert_eq!(spec.shutdown().timeout(), Duration::from_millis(300));
        assert!(!spec.shutdown().is_graceful());
    }

    #[test]
    fn test_invalid_specs_are_rejected() {
        let err = noop()
            .with_policy(RestartPolicy::new(Duration::ZERO, 1, Duration::ZERO))
            .validate()
            .unwrap_err();
        assert_eq!(err.as_label(), "runtime_invalid_spec");

        let err = noop()
            .with_policy(RestartPolicy {
                delay: RestartDelay::Range(Duration::from_secs(3)..Duration::from_secs(1)),
                ..RestartPolicy::default()
            })
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("noop"));

        let blank = ChildSpec::from_fn("  ", |_stop: CancellationToken| async { Ok::<(), WorkerError>(()) });
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_shutdown_setters_compose() {
        let spec = ChildSpec::from_fn("noop", |_stop: CancellationToken| async { Ok::<(), WorkerError>(()) })
            .with_shutdown_timeout(Duration::from_secs(9))
            .with_shutdown(ShutdownSpec::kill(Duration::from_secs(2)))
            .with_shutdown_method(|w| w.stop());
        assert!(spec.shutdown().is_graceful());
        assert_eq!(spec.shutdown().timeout(), Duration::from_secs(2));
    }
}
