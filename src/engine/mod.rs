//! Progression engine - turns persisted training intervals into experience
//!
//! One engine observes one user's ledger. Any number of engines (tabs,
//! devices) may observe the same user; the ledger arbitrates between them:
//! - a completion is only settled while the ledger still holds that interval
//! - experience and items are credited under the interval's id, once
//! - locally, an in-flight set stops two passes crediting the same skill
//!
//! Local timers are disposable. Detaching stops them without touching the
//! ledger, and attaching again reconciles whatever expired in the meantime.

pub mod completion;
pub mod events;
pub(crate) mod inflight;
pub mod reconcile;
pub mod state;
pub mod timer;

pub use completion::{CompletionOutcome, CompletionReport};
pub use events::{EngineEvent, EventSink};
pub use reconcile::ReconcileReport;
pub use state::{TimerView, TrainingState};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::catalog::SkillCatalog;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{self, EngineConfig};
use crate::core::error::{EngineError, Result};
use crate::core::types::{SkillId, UserId};
use crate::engine::inflight::InFlight;
use crate::ledger::{Backend, TrainingInterval};

/// Result of a start request
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A new interval was written
    Started(TrainingInterval),
    /// The skill already had a running interval; nothing was written
    AlreadyRunning(TrainingInterval),
}

impl StartOutcome {
    pub fn interval(&self) -> &TrainingInterval {
        match self {
            StartOutcome::Started(interval) | StartOutcome::AlreadyRunning(interval) => interval,
        }
    }
}

/// Local state kept for one skill
#[derive(Debug, Default)]
pub(crate) struct SkillSlot {
    pub(crate) state: TrainingState,
    pub(crate) countdown: Option<JoinHandle<()>>,
}

impl SkillSlot {
    fn stop_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

/// Shared engine internals, owned by the handle and its background tasks
pub(crate) struct EngineCore {
    pub(crate) user: UserId,
    pub(crate) catalog: Arc<SkillCatalog>,
    pub(crate) backend: Backend,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    pub(crate) rng: Mutex<ChaCha8Rng>,
    pub(crate) inflight: InFlight,
    pub(crate) events: EventSink,
    slots: Mutex<BTreeMap<SkillId, SkillSlot>>,
    /// Present while attached; countdowns report expiry through it
    expiry_tx: Mutex<Option<mpsc::UnboundedSender<SkillId>>>,
}

impl EngineCore {
    fn slots(&self) -> MutexGuard<'_, BTreeMap<SkillId, SkillSlot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expiry_sender(&self) -> Option<mpsc::UnboundedSender<SkillId>> {
        self.expiry_tx.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn state_of(&self, skill: &SkillId) -> TrainingState {
        self.slots().get(skill).map(|s| s.state.clone()).unwrap_or_default()
    }

    /// Record a running interval and, while attached, make sure exactly one
    /// countdown watches it
    pub(crate) fn mark_running(&self, interval: TrainingInterval) {
        let expiry = self.expiry_sender();
        let mut slots = self.slots();
        let slot = slots.entry(interval.skill_id.clone()).or_default();

        let same_interval = slot
            .state
            .interval()
            .is_some_and(|current| current.interval_id == interval.interval_id);
        let watching = slot.countdown.as_ref().is_some_and(|h| !h.is_finished());
        slot.state = TrainingState::Running(interval.clone());

        if same_interval && watching {
            return;
        }
        slot.stop_countdown();

        if let Some(expiry) = expiry {
            slot.countdown = Some(timer::spawn_countdown(
                interval,
                Arc::clone(&self.clock),
                Duration::from_millis(self.config.tick_period_ms),
                self.events.clone(),
                expiry,
            ));
        }
    }

    pub(crate) fn mark_completable(&self, interval: TrainingInterval) {
        let mut slots = self.slots();
        let slot = slots.entry(interval.skill_id.clone()).or_default();
        slot.stop_countdown();
        slot.state = TrainingState::Completable(interval);
    }

    pub(crate) fn mark_observed(&self, interval: TrainingInterval) {
        if interval.is_completable(self.clock.now()) {
            self.mark_completable(interval);
        } else {
            self.mark_running(interval);
        }
    }

    pub(crate) fn mark_idle(&self, skill: &SkillId) {
        if let Some(slot) = self.slots().get_mut(skill) {
            slot.stop_countdown();
            slot.state = TrainingState::Idle;
        }
    }

    /// While attached, re-signal `skill` after the retry delay. Any later
    /// state change for the skill cancels the pending retry.
    pub(crate) fn schedule_retry(&self, skill: &SkillId) {
        let Some(expiry) = self.expiry_sender() else {
            return;
        };
        let mut slots = self.slots();
        let slot = slots.entry(skill.clone()).or_default();
        slot.stop_countdown();
        slot.countdown = Some(timer::spawn_retry(
            skill.clone(),
            Duration::from_millis(self.config.retry_delay_ms),
            expiry,
        ));
    }

    /// Skills that are not locally idle
    pub(crate) fn tracked_skills(&self) -> Vec<SkillId> {
        self.slots()
            .iter()
            .filter(|(_, slot)| !slot.state.is_idle())
            .map(|(skill, _)| skill.clone())
            .collect()
    }

    fn stop_all_countdowns(&self) {
        for slot in self.slots().values_mut() {
            slot.stop_countdown();
        }
    }
}

/// Builder for [`ProgressionEngine`]
pub struct EngineBuilder {
    user: UserId,
    catalog: Arc<SkillCatalog>,
    backend: Backend,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ProgressionEngine> {
        self.config.validate().map_err(EngineError::Config)?;

        let seed = self.config.rng_seed.unwrap_or_else(rand::random);
        let core = EngineCore {
            user: self.user,
            catalog: self.catalog,
            backend: self.backend,
            clock: self.clock,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            inflight: InFlight::new(),
            events: EventSink::new(self.config.event_capacity),
            config: self.config,
            slots: Mutex::new(BTreeMap::new()),
            expiry_tx: Mutex::new(None),
        };

        Ok(ProgressionEngine {
            core: Arc::new(core),
            observer: Mutex::new(None),
        })
    }
}

/// Handle to one user's progression engine
pub struct ProgressionEngine {
    core: Arc<EngineCore>,
    observer: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressionEngine {
    /// Start building an engine with the system clock and the process-wide config
    pub fn builder(user: UserId, catalog: Arc<SkillCatalog>, backend: Backend) -> EngineBuilder {
        EngineBuilder {
            user,
            catalog,
            backend,
            clock: Arc::new(SystemClock),
            config: config::config().clone(),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.core.user
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.core.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Receive ticks, completions and notices
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.core.events.subscribe()
    }

    /// Local state-machine position of a skill
    pub fn state(&self, skill: &SkillId) -> TrainingState {
        self.core.state_of(skill)
    }

    /// Timer view of a skill at the current instant
    pub fn view(&self, skill: &SkillId) -> Option<TimerView> {
        let now = self.core.clock.now();
        match self.core.state_of(skill).interval() {
            Some(interval) => Some(TimerView::compute(interval, now)),
            None => self.core.catalog.get(skill).map(TimerView::idle),
        }
    }

    /// Timer views of every catalog skill
    pub fn views(&self) -> Vec<TimerView> {
        self.core
            .catalog
            .all()
            .iter()
            .filter_map(|skill| self.view(&skill.id))
            .collect()
    }

    /// Start training `skill`.
    ///
    /// A running interval is left alone. An expired one is credited first.
    pub async fn start_training(&self, skill: &SkillId) -> Result<StartOutcome> {
        let core = &self.core;
        let definition = core
            .catalog
            .get(skill)
            .ok_or_else(|| EngineError::UnknownSkill(skill.clone()))?;

        if let Some(current) = core.backend.ledger.get(&core.user, skill).await? {
            if !current.is_completable(core.clock.now()) {
                core.mark_running(current.clone());
                return Ok(StartOutcome::AlreadyRunning(current));
            }

            core.complete(&current).await?;

            // Completion may have re-armed the skill, here or in another client
            if let Some(after) = core.backend.ledger.get(&core.user, skill).await? {
                if !after.is_completable(core.clock.now()) {
                    core.mark_running(after.clone());
                    return Ok(StartOutcome::AlreadyRunning(after));
                }
            }
        }

        let interval = TrainingInterval::starting(definition, core.clock.now())
            .ok_or_else(|| EngineError::IntervalOverflow(skill.clone()))?;
        core.backend.ledger.put(&core.user, interval.clone()).await?;
        tracing::info!(
            user = %core.user,
            skill = %skill,
            ends = %interval.end_time,
            "training started"
        );

        // Optimistic; the next ledger read overwrites it
        core.mark_running(interval.clone());
        core.events.emit(EngineEvent::Started {
            interval: interval.clone(),
        });
        Ok(StartOutcome::Started(interval))
    }

    /// Drop the current interval of `skill` without crediting it
    pub async fn abandon_training(&self, skill: &SkillId) -> Result<bool> {
        let core = &self.core;
        let Some(current) = core.backend.ledger.get(&core.user, skill).await? else {
            core.mark_idle(skill);
            return Ok(false);
        };

        let cleared = core
            .backend
            .ledger
            .settle(&core.user, skill, current.interval_id, None)
            .await?;
        if cleared {
            tracing::info!(user = %core.user, skill = %skill, "training abandoned");
            core.mark_idle(skill);
        }
        Ok(cleared)
    }

    /// Persist the auto-training flag. Enabling it on an idle skill starts training.
    pub async fn set_auto_training(&self, skill: &SkillId, enabled: bool) -> Result<Option<StartOutcome>> {
        let core = &self.core;
        if !core.catalog.contains(skill) {
            return Err(EngineError::UnknownSkill(skill.clone()));
        }

        core.backend.flags.set_auto_training(&core.user, skill, enabled).await?;
        tracing::debug!(user = %core.user, skill = %skill, enabled, "auto-training toggled");

        if !enabled {
            return Ok(None);
        }
        match core.backend.ledger.get(&core.user, skill).await? {
            Some(current) if !current.is_completable(core.clock.now()) => Ok(None),
            _ => self.start_training(skill).await.map(Some),
        }
    }

    /// Run the completion transaction for `interval`.
    ///
    /// Safe to call any number of times, from any number of engines.
    pub async fn complete(&self, interval: &TrainingInterval) -> Result<CompletionOutcome> {
        self.core.complete(interval).await
    }

    /// Read the whole ledger and reconcile every skill against the clock
    pub async fn reconcile_now(&self) -> Result<ReconcileReport> {
        self.core.reconcile_now().await
    }

    /// Reconcile, then keep observing ledger changes and running countdowns
    /// until [`detach`](Self::detach)
    pub async fn attach(&self) -> Result<ReconcileReport> {
        self.detach();

        let core = Arc::clone(&self.core);
        // Subscribe before the first read so no change falls in between
        let mut feed = core.backend.ledger.subscribe(&core.user);
        let (expiry_tx, mut expiry_rx) = mpsc::unbounded_channel();
        *core.expiry_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(expiry_tx);

        let report = match core.reconcile_now().await {
            Ok(report) => report,
            Err(e) => {
                self.detach();
                return Err(e);
            }
        };

        let observer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = feed.recv() => match received {
                        Ok(snapshot) => {
                            core.reconcile_snapshot(snapshot).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(user = %core.user, missed, "ledger feed lagged, re-reading");
                            if let Err(e) = core.reconcile_now().await {
                                tracing::warn!(user = %core.user, error = %e, "ledger re-read failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    Some(skill) = expiry_rx.recv() => {
                        core.reconcile_skill(&skill).await;
                    }
                }
            }
            tracing::debug!(user = %core.user, "ledger feed closed");
        });

        *self.observer.lock().unwrap_or_else(|e| e.into_inner()) = Some(observer);
        tracing::info!(user = %self.core.user, "engine attached");
        Ok(report)
    }

    /// Stop observing. Local timers stop; the ledger is left untouched.
    pub fn detach(&self) {
        let observer = self.observer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(observer) = observer {
            observer.abort();
            tracing::info!(user = %self.core.user, "engine detached");
        }
        self.core.expiry_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        self.core.stop_all_countdowns();
    }

    pub fn is_attached(&self) -> bool {
        self.observer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ProgressionEngine {
    fn drop(&mut self) {
        self.detach();
    }
}
