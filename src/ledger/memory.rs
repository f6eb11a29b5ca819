//! In-memory backend implementing every store trait
//!
//! Used by the demo binary and the tests. All state sits behind one mutex so
//! each trait call is atomic, which is the guarantee a hosted document store
//! gives for single-document conditional writes and field increments.

use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::core::types::{IntervalId, ItemId, SkillId, UserId};
use crate::ledger::interval::TrainingInterval;
use crate::ledger::inventory::Inventory;
use crate::ledger::store::{
    AutoTrainingFlags, InventoryStore, LedgerSnapshot, ProgressStore, StoreError, TrainingLedger,
};
use crate::progression::SkillProgress;

/// Capacity of each user's ledger change feed
const FEED_CAPACITY: usize = 64;

/// Everything stored for one user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    pub training: LedgerSnapshot,
    pub skills: BTreeMap<SkillId, SkillProgress>,
    pub inventory: Inventory,
    pub auto_training: BTreeMap<SkillId, bool>,
    /// Intervals whose experience has been credited
    pub credited_exp: BTreeSet<IntervalId>,
    /// Intervals whose drops have been merged
    pub credited_items: BTreeSet<IntervalId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryState {
    users: AHashMap<UserId, UserRecord>,
}

impl MemoryState {
    fn user_mut(&mut self, user: &UserId) -> &mut UserRecord {
        self.users.entry(user.clone()).or_default()
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    feeds: Mutex<AHashMap<UserId, broadcast::Sender<LedgerSnapshot>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn feed(&self, user: &UserId) -> broadcast::Sender<LedgerSnapshot> {
        let mut feeds = self.feeds.lock().unwrap_or_else(|e| e.into_inner());
        feeds
            .entry(user.clone())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone()
    }

    fn publish(&self, user: &UserId, snapshot: LedgerSnapshot) {
        // No subscribers is fine; the ledger itself is the source of truth
        let _ = self.feed(user).send(snapshot);
    }

    /// Copy of everything stored for `user`
    pub fn user(&self, user: &UserId) -> UserRecord {
        self.state().users.get(user).cloned().unwrap_or_default()
    }

    pub fn experience_of(&self, user: &UserId, skill: &SkillId) -> u64 {
        self.state()
            .users
            .get(user)
            .and_then(|u| u.skills.get(skill))
            .map(|p| p.experience)
            .unwrap_or(0)
    }

    pub fn item_count(&self, user: &UserId, item: &ItemId) -> u64 {
        self.state().users.get(user).map(|u| u.inventory.get(item)).unwrap_or(0)
    }

    /// Overwrite a progress record (admin adjustment, test seeding)
    pub fn set_progress(&self, user: &UserId, skill: &SkillId, progress: SkillProgress) {
        self.state().user_mut(user).skills.insert(skill.clone(), progress);
    }

    /// Serialize the whole store, e.g. to simulate closing the client
    pub fn export_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(&*self.state()).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Rebuild a store from `export_json` output
    pub fn import_json(json: &str) -> Result<Self, StoreError> {
        let state: MemoryState =
            serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            state: Mutex::new(state),
            feeds: Mutex::new(AHashMap::new()),
        })
    }
}

#[async_trait]
impl TrainingLedger for MemoryBackend {
    async fn snapshot(&self, user: &UserId) -> Result<LedgerSnapshot, StoreError> {
        Ok(self.state().users.get(user).map(|u| u.training.clone()).unwrap_or_default())
    }

    async fn get(&self, user: &UserId, skill: &SkillId) -> Result<Option<TrainingInterval>, StoreError> {
        Ok(self.state().users.get(user).and_then(|u| u.training.get(skill).cloned()))
    }

    async fn put(&self, user: &UserId, interval: TrainingInterval) -> Result<(), StoreError> {
        let snapshot = {
            let mut state = self.state();
            let record = state.user_mut(user);
            record.training.insert(interval.skill_id.clone(), interval);
            record.training.clone()
        };
        self.publish(user, snapshot);
        Ok(())
    }

    async fn settle(
        &self,
        user: &UserId,
        skill: &SkillId,
        expected: IntervalId,
        next: Option<TrainingInterval>,
    ) -> Result<bool, StoreError> {
        let snapshot = {
            let mut state = self.state();
            let record = state.user_mut(user);
            match record.training.get(skill) {
                Some(current) if current.interval_id == expected => {}
                _ => return Ok(false),
            }
            match next {
                Some(next) => {
                    record.training.insert(skill.clone(), next);
                }
                None => {
                    record.training.remove(skill);
                }
            }
            record.training.clone()
        };
        self.publish(user, snapshot);
        Ok(true)
    }

    fn subscribe(&self, user: &UserId) -> broadcast::Receiver<LedgerSnapshot> {
        self.feed(user).subscribe()
    }
}

#[async_trait]
impl ProgressStore for MemoryBackend {
    async fn progress(&self, user: &UserId, skill: &SkillId) -> Result<SkillProgress, StoreError> {
        Ok(SkillProgress::new(self.experience_of(user, skill)))
    }

    async fn increment_experience(
        &self,
        user: &UserId,
        skill: &SkillId,
        amount: u64,
        credit: IntervalId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state();
        let record = state.user_mut(user);
        if !record.credited_exp.insert(credit) {
            return Ok(false);
        }
        let progress = record.skills.entry(skill.clone()).or_default();
        progress.experience = progress.experience.saturating_add(amount);
        Ok(true)
    }
}

#[async_trait]
impl InventoryStore for MemoryBackend {
    async fn add_items(&self, user: &UserId, items: &[ItemId], credit: IntervalId) -> Result<bool, StoreError> {
        let mut state = self.state();
        let record = state.user_mut(user);
        if !record.credited_items.insert(credit) {
            return Ok(false);
        }
        record.inventory.merge(items);
        Ok(true)
    }
}

#[async_trait]
impl AutoTrainingFlags for MemoryBackend {
    async fn auto_training(&self, user: &UserId, skill: &SkillId) -> Result<bool, StoreError> {
        Ok(self
            .state()
            .users
            .get(user)
            .and_then(|u| u.auto_training.get(skill).copied())
            .unwrap_or(false))
    }

    async fn set_auto_training(&self, user: &UserId, skill: &SkillId, enabled: bool) -> Result<(), StoreError> {
        self.state().user_mut(user).auto_training.insert(skill.clone(), enabled);
        Ok(())
    }
}
