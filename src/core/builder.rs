use std::sync::Arc;

use crate::{
    core::{Child, SupervisedChild, Supervisor, SupervisorConfig},
    error::RuntimeError,
    events::Bus,
    subscribers::Subscribe,
    workers::{ChildSpec, Worker},
};

/// Builder for constructing a [`Supervisor`] with its initial children.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    bus: Bus,
    children: Vec<Arc<dyn SupervisedChild>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            children: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Registers a child; startup follows registration order.
    ///
    /// Fails on an invalid spec or a duplicate id.
    pub fn with_child<W: Worker>(mut self, spec: ChildSpec<W>) -> Result<Self, RuntimeError> {
        spec.validate()?;
        if self.children.iter().any(|c| c.id() == spec.id()) {
            return Err(RuntimeError::DuplicateChild {
                child: Arc::clone(spec.id_arc()),
            });
        }
        self.children.push(Child::new(spec, self.bus.clone()));
        Ok(self)
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (child lifecycle, restarts, shutdown)
    /// through dedicated workers with bounded queues, while a run is active.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor. Nothing is spawned until [`Supervisor::run`].
    pub fn build(self) -> Arc<Supervisor> {
        Arc::new(Supervisor::new_internal(
            self.cfg,
            self.bus,
            self.subscribers,
            self.children,
        ))
    }
}
