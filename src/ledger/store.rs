//! Persistence seams consumed by the progression engine
//!
//! Any hosted document store can sit behind these traits. The engine relies
//! on three properties only:
//! - `settle` is a conditional write against the expected interval id
//! - experience and item credits keyed by the same interval id apply once
//! - ledger changes are pushed to subscribers

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::core::types::{IntervalId, ItemId, SkillId, UserId};
use crate::ledger::interval::TrainingInterval;
use crate::progression::SkillProgress;

/// Every active interval of one user, keyed by skill
pub type LedgerSnapshot = BTreeMap<SkillId, TrainingInterval>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connectivity or availability failure; the operation may be retried
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// The durable per-user map of skill -> active interval
#[async_trait]
pub trait TrainingLedger: Send + Sync {
    /// Read every active interval of `user`
    async fn snapshot(&self, user: &UserId) -> Result<LedgerSnapshot, StoreError>;

    /// Read the interval for one skill
    async fn get(&self, user: &UserId, skill: &SkillId) -> Result<Option<TrainingInterval>, StoreError>;

    /// Create or replace the interval for `interval.skill_id`
    async fn put(&self, user: &UserId, interval: TrainingInterval) -> Result<(), StoreError>;

    /// Clear (`next == None`) or replace (`next == Some`) the entry for `skill`,
    /// but only while it still holds `expected`.
    ///
    /// Returns `false` when the entry was already cleared or replaced.
    async fn settle(
        &self,
        user: &UserId,
        skill: &SkillId,
        expected: IntervalId,
        next: Option<TrainingInterval>,
    ) -> Result<bool, StoreError>;

    /// Push-style change feed; every ledger write for `user` sends a fresh snapshot
    fn subscribe(&self, user: &UserId) -> broadcast::Receiver<LedgerSnapshot>;
}

/// Per-skill experience totals
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Current progress; a missing record reads as zero experience
    async fn progress(&self, user: &UserId, skill: &SkillId) -> Result<SkillProgress, StoreError>;

    /// Atomically add `amount` experience unless `credit` was already applied.
    ///
    /// Returns whether this call applied the increment.
    async fn increment_experience(
        &self,
        user: &UserId,
        skill: &SkillId,
        amount: u64,
        credit: IntervalId,
    ) -> Result<bool, StoreError>;
}

/// Item quantities
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Add one of each item unless `credit` was already applied
    async fn add_items(&self, user: &UserId, items: &[ItemId], credit: IntervalId) -> Result<bool, StoreError>;
}

/// Per-skill auto-training switches
#[async_trait]
pub trait AutoTrainingFlags: Send + Sync {
    async fn auto_training(&self, user: &UserId, skill: &SkillId) -> Result<bool, StoreError>;

    async fn set_auto_training(&self, user: &UserId, skill: &SkillId, enabled: bool) -> Result<(), StoreError>;
}

/// The set of stores one engine talks to
#[derive(Clone)]
pub struct Backend {
    pub ledger: Arc<dyn TrainingLedger>,
    pub progress: Arc<dyn ProgressStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub flags: Arc<dyn AutoTrainingFlags>,
}

impl Backend {
    /// Use one object for every store
    pub fn shared<T>(store: Arc<T>) -> Self
    where
        T: TrainingLedger + ProgressStore + InventoryStore + AutoTrainingFlags + 'static,
    {
        Self {
            ledger: store.clone(),
            progress: store.clone(),
            inventory: store.clone(),
            flags: store,
        }
    }
}
