//! The completion transaction
//!
//! Credits one expired interval. Every effect is keyed by the interval id,
//! so the whole sequence may be repeated after a partial failure, or run
//! concurrently by several clients, and still credit once.

use serde::Serialize;

use crate::core::error::Result;
use crate::core::types::ItemId;
use crate::engine::events::EngineEvent;
use crate::engine::EngineCore;
use crate::ledger::TrainingInterval;
use crate::progression::{experience_gain, resolve_drops, DropChances, SkillProgress};

/// What a completion attempt did
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// This call settled the interval; the credit under its id is in place
    Credited(CompletionReport),
    /// Another attempt settled the interval first
    AlreadyCredited,
    /// The ledger no longer holds this interval
    Superseded,
    /// The interval has not reached its end time
    NotDue,
    /// Another local pass is crediting this skill right now
    InFlight,
    /// The skill left the catalog; the interval was cleared without credit
    Discarded,
}

impl CompletionOutcome {
    pub fn is_credited(&self) -> bool {
        matches!(self, CompletionOutcome::Credited(_))
    }

    pub fn report(&self) -> Option<&CompletionReport> {
        match self {
            CompletionOutcome::Credited(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub interval: TrainingInterval,
    pub exp_gained: u64,
    pub drops: Vec<ItemId>,
    pub level_before: u32,
    pub level_after: u32,
    /// The next interval, when auto-training re-armed the skill
    pub rearmed: Option<TrainingInterval>,
}

impl CompletionReport {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

impl EngineCore {
    pub(crate) async fn complete(&self, interval: &TrainingInterval) -> Result<CompletionOutcome> {
        let skill = &interval.skill_id;
        let Some(_guard) = self.inflight.try_acquire(skill) else {
            tracing::debug!(skill = %skill, "completion already in flight");
            return Ok(CompletionOutcome::InFlight);
        };

        let current = self.backend.ledger.get(&self.user, skill).await?;
        match current {
            Some(current) if current.interval_id == interval.interval_id => {}
            other => {
                tracing::debug!(skill = %skill, interval = %interval.interval_id, "completion superseded");
                match other {
                    Some(next) => self.mark_observed(next),
                    None => self.mark_idle(skill),
                }
                return Ok(CompletionOutcome::Superseded);
            }
        }

        let now = self.clock.now();
        if !interval.is_completable(now) {
            return Ok(CompletionOutcome::NotDue);
        }

        let Some(definition) = self.catalog.get(skill) else {
            let cleared = self
                .backend
                .ledger
                .settle(&self.user, skill, interval.interval_id, None)
                .await?;
            self.mark_idle(skill);
            if !cleared {
                return Ok(CompletionOutcome::Superseded);
            }
            tracing::warn!(user = %self.user, skill = %skill, "skill missing from catalog, interval discarded");
            self.events.emit(EngineEvent::Notice {
                skill_id: skill.clone(),
                message: format!("training for '{}' ended without reward: skill no longer exists", skill),
            });
            return Ok(CompletionOutcome::Discarded);
        };

        let max_level = self.config.max_level;
        let before = self.backend.progress.progress(&self.user, skill).await?;
        let level_before = before.level(max_level);
        let exp_gained = experience_gain(interval.base_exp_snapshot, level_before);

        let applied = self
            .backend
            .progress
            .increment_experience(&self.user, skill, exp_gained, interval.interval_id)
            .await?;

        let drops = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            resolve_drops(definition, DropChances::from_config(&self.config), &mut *rng)
        };
        // Always merged, even when empty, so the first merge pins the roll
        let merged = self
            .backend
            .inventory
            .add_items(&self.user, &drops, interval.interval_id)
            .await?;

        let auto = self.backend.flags.auto_training(&self.user, skill).await?;
        let next = if auto {
            let next = TrainingInterval::starting(definition, now);
            if next.is_none() {
                tracing::warn!(user = %self.user, skill = %skill, "re-arm skipped, interval does not fit the calendar");
            }
            next
        } else {
            None
        };

        let settled = self
            .backend
            .ledger
            .settle(&self.user, skill, interval.interval_id, next.clone())
            .await?;

        if !settled {
            // Another attempt cleared or replaced the entry and owns the notice
            tracing::debug!(skill = %skill, interval = %interval.interval_id, "credit settled elsewhere");
            return Ok(CompletionOutcome::AlreadyCredited);
        }

        let rearmed = next;
        match &rearmed {
            Some(next) => self.mark_running(next.clone()),
            None => self.mark_idle(skill),
        }

        // A retry after a partial failure finds its increment already in `before`
        let level_after = if applied {
            SkillProgress::new(before.experience.saturating_add(exp_gained)).level(max_level)
        } else {
            level_before
        };
        let drops = if merged { drops } else { Vec::new() };
        tracing::info!(
            user = %self.user,
            skill = %skill,
            exp_gained,
            drops = drops.len(),
            level = level_after,
            rearmed = rearmed.is_some(),
            retried = !applied,
            "training completed"
        );

        let report = CompletionReport {
            interval: interval.clone(),
            exp_gained,
            drops,
            level_before,
            level_after,
            rearmed,
        };
        self.events.emit(EngineEvent::Completed {
            skill_id: skill.clone(),
            exp_gained,
            drops: report.drops.clone(),
            level: level_after,
            leveled_up: report.leveled_up(),
            rearmed: report.rearmed.is_some(),
        });
        Ok(CompletionOutcome::Credited(report))
    }
}
