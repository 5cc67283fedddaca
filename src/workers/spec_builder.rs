use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    Access, ChildSpec, RestartMode, RestartPolicy, Worker, WorkerError, WorkerFn,
};

/// Builder for [`ChildSpec`] with fluent API.
///
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use ultravisor::{ChildSpecBuilder, RestartMode, WorkerError};
///
/// let spec = ChildSpecBuilder::new("poller")
///     .with_restart(RestartMode::OnFailure)
///     .with_shutdown_timeout(Duration::from_millis(500))
///     .build_fn(|stop: CancellationToken| async move {
///         stop.cancelled().await;
///         Ok::<(), WorkerError>(())
///     });
/// assert_eq!(spec.restart(), RestartMode::OnFailure);
/// ```
///
/// Collects the worker-independent knobs; the worker type is fixed by
/// [`build`](Self::build) / [`build_fn`](Self::build_fn).
#[derive(Clone, Debug)]
pub struct ChildSpecBuilder {
    id: Arc<str>,
    restart: RestartMode,
    policy: RestartPolicy,
    shutdown_timeout: Duration,
    access: Access,
    castcall: bool,
}

impl ChildSpecBuilder {
    /// Creates a new builder for the child `id`.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            restart: RestartMode::default(),
            policy: RestartPolicy::default(),
            shutdown_timeout: Duration::from_secs(1),
            access: Access::default(),
            castcall: false,
        }
    }

    pub fn with_restart(mut self, restart: RestartMode) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_castcall(mut self, enabled: bool) -> Self {
        self.castcall = enabled;
        self
    }

    /// Build ChildSpec from a worker factory.
    pub fn build<W, F>(self, factory: F) -> ChildSpec<W>
    where
        W: Worker,
        F: Fn() -> W + Send + Sync + 'static,
    {
        ChildSpec::new(self.id, factory)
            .with_restart(self.restart)
            .with_policy(self.policy)
            .with_shutdown_timeout(self.shutdown_timeout)
            .with_access(self.access)
            .with_castcall(self.castcall)
    }

    /// Build ChildSpec from a closure (see [`ChildSpec::from_fn`]).
    pub fn build_fn<F, Fut>(self, f: F) -> ChildSpec<WorkerFn<F>>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        ChildSpec::from_fn(self.id, f)
            .with_restart(self.restart)
            .with_policy(self.policy)
            .with_shutdown_timeout(self.shutdown_timeout)
            .with_access(self.access)
            .with_castcall(self.castcall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::workers::ChildContext;

    struct Idle;

    #[async_trait]
    impl Worker for Idle {
        type Output = ();

        async fn run(self: Arc<Self>, _ctx: ChildContext<Self>) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    fn tuned() -> ChildSpecBuilder {
        ChildSpecBuilder::new("tuned")
            .with_restart(RestartMode::Never)
            .with_policy(RestartPolicy::new(
                Duration::from_secs(30),
                7,
                Duration::from_millis(20)..Duration::from_millis(40),
            ))
            .with_shutdown_timeout(Duration::from_millis(750))
            .with_access(Access::Unsafe)
            .with_castcall(true)
    }

    fn assert_tuned<W: Worker>(spec: &ChildSpec<W>) {
        assert_eq!(spec.id(), "tuned");
        assert_eq!(spec.restart(), RestartMode::Never);
        assert_eq!(
            spec.policy(),
            &RestartPolicy::new(
                Duration::from_secs(30),
                7,
                Duration::from_millis(20)..Duration::from_millis(40),
            )
        );
        assert_eq!(spec.shutdown().timeout(), Duration::from_millis(750));
        assert!(!spec.shutdown().is_graceful());
        assert_eq!(spec.access(), Access::Unsafe);
        assert!(spec.castcall());
    }

    #[test]
    fn test_build_carries_every_setting() {
        assert_tuned(&tuned().build(|| Idle));
    }

    #[test]
    fn test_build_fn_carries_every_setting() {
        let spec = tuned().build_fn(|stop: CancellationToken| async move {
            stop.cancelled().await;
            Ok(())
        });
        assert_tuned(&spec);
    }

    #[test]
    fn test_defaults_match_plain_spec() {
        let built = ChildSpecBuilder::new("plain").build(|| Idle);
        let plain = ChildSpec::new("plain", || Idle);
        assert_eq!(built.restart(), plain.restart());
        assert_eq!(built.policy(), plain.policy());
        assert_eq!(built.shutdown().timeout(), plain.shutdown().timeout());
        assert_eq!(built.access(), plain.access());
        assert_eq!(built.castcall(), plain.castcall());
    }
}
