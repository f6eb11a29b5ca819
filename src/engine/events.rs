//! Engine events - fire-and-forget notifications for the presentation layer

use serde::Serialize;
use tokio::sync::broadcast;

use crate::core::types::{ItemId, SkillId};
use crate::engine::state::TimerView;
use crate::ledger::TrainingInterval;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new interval was written by an explicit start
    Started { interval: TrainingInterval },

    /// Periodic countdown refresh
    Tick(TimerView),

    /// An interval was settled by this client, including a retry whose
    /// credit landed on an earlier attempt
    Completed {
        skill_id: SkillId,
        exp_gained: u64,
        drops: Vec<ItemId>,
        level: u32,
        leveled_up: bool,
        rearmed: bool,
    },

    /// Informational, e.g. an interval discarded because its skill was removed
    Notice { skill_id: SkillId, message: String },

    /// A completion attempt failed and will be retried on the next pass
    Failed { skill_id: SkillId, error: String },
}

/// Broadcast sink for engine events
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: EngineEvent) {
        // Nobody listening is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}
