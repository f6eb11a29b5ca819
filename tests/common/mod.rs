//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use skillforge::core::ManualClock;
use skillforge::ledger::{
    AutoTrainingFlags, InventoryStore, LedgerSnapshot, ProgressStore, StoreError, TrainingLedger,
};
use skillforge::progression::SkillProgress;
use skillforge::{
    Backend, EngineConfig, IntervalId, ItemId, MemoryBackend, ProgressionEngine, SkillCatalog, SkillDefinition,
    SkillId, TrainingInterval, UserId,
};

pub fn user() -> UserId {
    UserId::new("player-1")
}

pub fn woodcutting() -> SkillId {
    SkillId::new("woodcutting")
}

/// woodcutting (10 exp / 60 s, drops `item_a`) and mining (12 exp / 90 s)
pub fn catalog() -> Arc<SkillCatalog> {
    let mut catalog = SkillCatalog::new();
    catalog.add(SkillDefinition::new("woodcutting", "Woodcutting", 10, 60).with_common_drops(["item_a"]));
    catalog.add(
        SkillDefinition::new("mining", "Mining", 12, 90)
            .with_common_drops(["copper_ore"])
            .with_rare_drops(["uncut_gem"]),
    );
    Arc::new(catalog)
}

/// Config whose drop rolls always succeed
pub fn always_drop() -> EngineConfig {
    EngineConfig {
        common_drop_chance: 1.0,
        rare_drop_chance: 1.0,
        tick_period_ms: 20,
        rng_seed: Some(42),
        ..EngineConfig::default()
    }
}

pub fn engine_with(
    backend: Backend,
    catalog: Arc<SkillCatalog>,
    clock: &Arc<ManualClock>,
    config: EngineConfig,
) -> ProgressionEngine {
    ProgressionEngine::builder(user(), catalog, backend)
        .clock(clock.clone())
        .config(config)
        .build()
        .expect("valid config")
}

pub fn engine(store: &Arc<MemoryBackend>, clock: &Arc<ManualClock>) -> ProgressionEngine {
    engine_with(Backend::shared(store.clone()), catalog(), clock, always_drop())
}

/// Wraps a [`MemoryBackend`] and fails selected operations a set number of times
#[derive(Default)]
pub struct FlakyBackend {
    pub inner: Arc<MemoryBackend>,
    pub fail_snapshot: AtomicU32,
    pub fail_increment: AtomicU32,
    pub fail_add_items: AtomicU32,
    pub fail_settle: AtomicU32,
}

impl FlakyBackend {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    fn trip(counter: &AtomicU32, op: &str) -> Result<(), StoreError> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(StoreError::Unavailable(format!("{} timed out", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl TrainingLedger for FlakyBackend {
    async fn snapshot(&self, user: &UserId) -> Result<LedgerSnapshot, StoreError> {
        Self::trip(&self.fail_snapshot, "snapshot")?;
        self.inner.snapshot(user).await
    }

    async fn get(&self, user: &UserId, skill: &SkillId) -> Result<Option<TrainingInterval>, StoreError> {
        self.inner.get(user, skill).await
    }

    async fn put(&self, user: &UserId, interval: TrainingInterval) -> Result<(), StoreError> {
        self.inner.put(user, interval).await
    }

    async fn settle(
        &self,
        user: &UserId,
        skill: &SkillId,
        expected: IntervalId,
        next: Option<TrainingInterval>,
    ) -> Result<bool, StoreError> {
        Self::trip(&self.fail_settle, "settle")?;
        self.inner.settle(user, skill, expected, next).await
    }

    fn subscribe(&self, user: &UserId) -> broadcast::Receiver<LedgerSnapshot> {
        self.inner.subscribe(user)
    }
}

#[async_trait]
impl ProgressStore for FlakyBackend {
    async fn progress(&self, user: &UserId, skill: &SkillId) -> Result<SkillProgress, StoreError> {
        self.inner.progress(user, skill).await
    }

    async fn increment_experience(
        &self,
        user: &UserId,
        skill: &SkillId,
        amount: u64,
        credit: IntervalId,
    ) -> Result<bool, StoreError> {
        Self::trip(&self.fail_increment, "increment")?;
        self.inner.increment_experience(user, skill, amount, credit).await
    }
}

#[async_trait]
impl InventoryStore for FlakyBackend {
    async fn add_items(&self, user: &UserId, items: &[ItemId], credit: IntervalId) -> Result<bool, StoreError> {
        Self::trip(&self.fail_add_items, "add_items")?;
        self.inner.add_items(user, items, credit).await
    }
}

#[async_trait]
impl AutoTrainingFlags for FlakyBackend {
    async fn auto_training(&self, user: &UserId, skill: &SkillId) -> Result<bool, StoreError> {
        self.inner.auto_training(user, skill).await
    }

    async fn set_auto_training(&self, user: &UserId, skill: &SkillId, enabled: bool) -> Result<(), StoreError> {
        self.inner.set_auto_training(user, skill, enabled).await
    }
}
