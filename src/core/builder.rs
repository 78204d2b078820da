use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::config::SupervisorConfig;
use super::registry::Registry;
use super::runner::RunnerContext;
use super::supervisor::{subscriber_listener, Background, Supervisor};
use super::watchdog;
use crate::events::{Bus, Event, EventKind};
use crate::identity::PidStore;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events (start, stop escalation, crashes,
    /// idle timeouts) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the supervisor.
    ///
    /// Removes pid records of processes that are no longer alive (leftovers
    /// of a previous run), spawns the subscriber listener and, when
    /// `idle_timeout` is non-zero, the idle watchdog.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let cfg = Arc::new(self.cfg);
        let bus = Bus::new(cfg.bus_capacity);
        let store = Arc::new(
            PidStore::new(cfg.pid_dir.clone(), cfg.pid_prefix.clone())
                .with_sweep_waits(cfg.sweep_term_wait, cfg.sweep_kill_wait),
        );

        let listener_token = CancellationToken::new();
        let listener = subscriber_listener(
            bus.subscribe(),
            SubscriberSet::new(self.subscribers, bus.clone()),
            listener_token.clone(),
        );

        let stale = store.cleanup_dead();
        if !stale.is_empty() {
            tracing::info!(keys = ?stale, "removed stale pid records");
            bus.publish(Event::new(EventKind::StaleRecordsRemoved).with_reason(stale.join(",")));
        }

        let runtime_token = CancellationToken::new();
        let ctx = Arc::new(RunnerContext {
            cfg: Arc::clone(&cfg),
            store: Arc::clone(&store),
            bus: bus.clone(),
        });
        let registry = Registry::new(ctx, runtime_token.clone());

        let watchdog = cfg
            .idle_timeout()
            .map(|idle| watchdog::spawn(Arc::clone(&registry), idle, cfg.watchdog_interval));

        Arc::new(Supervisor::new_internal(
            cfg,
            bus,
            registry,
            store,
            runtime_token,
            listener_token,
            Background {
                watchdog,
                listener: Some(listener),
            },
        ))
    }
}
