//! The host-facing facade.
//!
//! A [`Bridge`] owns every component for one home: the state cache, the
//! quota tracker, the shared executor, the debounce gate, the command
//! worker and the dual-track poller. Hosts read attributes, submit intents,
//! subscribe to the event bus they passed in and invoke operator actions;
//! everything else happens on background tasks started by [`Bridge::start`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use hvacq_domain::attribute::CachedAttribute;
use hvacq_domain::command::{Intent, MAX_TEMPERATURE};
use hvacq_domain::error::{HvacqError, NotFoundError};
use hvacq_domain::event::EventKind;
use hvacq_domain::id::HomeId;
use hvacq_domain::quota::QuotaSnapshot;
use hvacq_domain::target::{AttributeKind, Scope, Target, Track};
use hvacq_domain::time::now;
use hvacq_domain::value::AttributeValue;

use crate::ports::{EventPublisher, RemoteApi, SessionRefresher};
use crate::services::command_queue::CommandQueue;
use crate::services::command_worker::CommandWorker;
use crate::services::context::BridgeContext;
use crate::services::debounce_gate::DebounceGate;
use crate::services::poller::DualTrackPoller;
use crate::services::state_cache::ResolvedValue;
use crate::settings::BridgeSettings;

pub struct Bridge<A, S, P> {
    context: Arc<BridgeContext<A, S, P>>,
    gate: DebounceGate,
    poller: Arc<DualTrackPoller<A, S, P>>,
    worker: Mutex<Option<CommandWorker<A, S, P>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<A, S, P> Bridge<A, S, P>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Assemble a bridge for `home`. Nothing runs until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Validation`] when `settings` are invalid.
    pub fn new(
        home: HomeId,
        api: A,
        sessions: S,
        publisher: P,
        settings: BridgeSettings,
    ) -> Result<Self, HvacqError> {
        settings.validate()?;
        let context = Arc::new(BridgeContext::new(
            home,
            api,
            sessions,
            Arc::new(publisher),
            settings.call_timeout,
            settings.optimistic_grace,
        ));
        let queue = Arc::new(CommandQueue::new());
        let gate = DebounceGate::new(settings.debounce, Arc::clone(&queue));
        let worker = CommandWorker::new(
            Arc::clone(&context),
            queue,
            gate.clone(),
            settings.retry,
            settings.batch_settle_max,
        );
        let poller = Arc::new(DualTrackPoller::new(
            Arc::clone(&context),
            settings.schedule,
            settings.throttle_threshold,
        ));
        Ok(Self {
            context,
            gate,
            poller,
            worker: Mutex::new(Some(worker)),
            tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Spawn the command worker and both poll tracks. Later calls are no-ops.
    pub fn start(&self) {
        let Some(worker) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(worker.spawn());
        tasks.extend(self.poller.spawn());
        tracing::info!(home = %self.context.home, "bridge started");
    }

    /// Stop background tasks and discard pending intents.
    ///
    /// A batch being executed is cut short at its next await point.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.gate.cancel_all();
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        tracing::info!(home = %self.context.home, "bridge stopped");
    }

    #[must_use]
    pub fn home(&self) -> HomeId {
        self.context.home
    }

    /// Last observed value of `target`, if any.
    #[must_use]
    pub fn attribute(&self, target: &Target) -> Option<CachedAttribute> {
        self.context.cache.get(target)
    }

    #[must_use]
    pub fn attributes(&self) -> Vec<CachedAttribute> {
        self.context.cache.snapshot()
    }

    /// The value to display for `target`, preferring an unconfirmed intent.
    #[must_use]
    pub fn resolve(&self, target: &Target) -> Option<ResolvedValue> {
        self.context.cache.resolve(target)
    }

    /// Validate a user intent, show it optimistically and hand it to the
    /// debounce gate.
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Closed`] after shutdown,
    /// [`HvacqError::NotFound`] for a home other than this bridge's, or
    /// [`HvacqError::Validation`] for an invalid intent.
    pub async fn submit(&self, target: Target, value: AttributeValue) -> Result<(), HvacqError> {
        self.ensure_open()?;
        if let Scope::Home(home) = target.scope
            && home != self.context.home
        {
            return Err(NotFoundError {
                entity: "Home",
                id: home.to_string(),
            }
            .into());
        }
        let intent = Intent::new(target, value, now())?;
        self.context.cache.set_optimistic(
            intent.target(),
            intent.value().clone(),
            intent.submitted_at(),
        );
        self.context
            .publish(EventKind::OptimisticSet {
                target: intent.target(),
                value: intent.value().clone(),
            })
            .await;
        self.gate.submit(intent);
        Ok(())
    }

    #[must_use]
    pub fn quota(&self) -> Option<QuotaSnapshot> {
        self.context.quota.current()
    }

    #[must_use]
    pub fn daily_limit(&self) -> Option<u32> {
        self.quota().map(|q| q.daily_limit)
    }

    #[must_use]
    pub fn remaining_calls(&self) -> Option<u32> {
        self.quota().map(|q| q.remaining)
    }

    fn ensure_open(&self) -> Result<(), HvacqError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HvacqError::Closed);
        }
        Ok(())
    }

    /// Run both poll tracks now, queued behind any batch in progress.
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Closed`] after shutdown, or
    /// [`HvacqError::Remote`] if a read failed.
    pub async fn manual_poll(&self) -> Result<(), HvacqError> {
        self.ensure_open()?;
        tracing::info!("manual poll requested");
        self.poller.poll_all().await?;
        Ok(())
    }

    /// Run a single track now: [`Track::Fast`] refreshes presence and zone
    /// state, [`Track::Slow`] zone metadata and batteries.
    ///
    /// Returns the number of attributes that changed.
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Closed`] after shutdown, or
    /// [`HvacqError::Remote`] if a read failed.
    pub async fn refresh(&self, track: Track) -> Result<usize, HvacqError> {
        self.ensure_open()?;
        tracing::info!(%track, "refresh requested");
        Ok(self.poller.poll(track).await?)
    }

    /// Put every known zone back on its schedule.
    ///
    /// Submits one intent per zone; debouncing and batch settling collapse
    /// them into a single batch with one confirmation read. Returns the
    /// number of zones submitted.
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Closed`] after shutdown.
    pub async fn resume_all_schedules(&self) -> Result<usize, HvacqError> {
        let zones = self
            .submit_to_all_zones(AttributeKind::AutoMode, AttributeValue::Bool(true))
            .await?;
        tracing::info!(zones, "resume all schedules");
        Ok(zones)
    }

    /// Switch the heating of every known zone off with a manual overlay.
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Closed`] after shutdown.
    pub async fn turn_off_all_zones(&self) -> Result<usize, HvacqError> {
        let zones = self
            .submit_to_all_zones(AttributeKind::Power, AttributeValue::Bool(false))
            .await?;
        tracing::info!(zones, "turn off all zones");
        Ok(zones)
    }

    /// Hold every known zone at the maximum setpoint until resumed.
    ///
    /// # Errors
    ///
    /// Returns [`HvacqError::Closed`] after shutdown.
    pub async fn boost_all_zones(&self) -> Result<usize, HvacqError> {
        let zones = self
            .submit_to_all_zones(
                AttributeKind::TargetTemperature,
                AttributeValue::Float(MAX_TEMPERATURE),
            )
            .await?;
        tracing::info!(zones, celsius = MAX_TEMPERATURE, "boost all zones");
        Ok(zones)
    }

    async fn submit_to_all_zones(
        &self,
        kind: AttributeKind,
        value: AttributeValue,
    ) -> Result<usize, HvacqError> {
        self.ensure_open()?;
        let zones = self.context.cache.known_zones();
        for zone in &zones {
            self.submit(Target::zone(*zone, kind), value.clone()).await?;
        }
        Ok(zones.len())
    }
}

impl<A, S, P> Drop for Bridge<A, S, P> {
    fn drop(&mut self) {
        self.gate.cancel_all();
        for task in self
            .tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
    }
}
