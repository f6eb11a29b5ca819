//! Local countdown tasks
//!
//! One task per running skill, ticking at the configured period. A tick only
//! recomputes the view and emits it; on expiry the task signals the
//! observation loop and exits. A failed completion gets a one-shot retry
//! task through the same channel. The ledger is never touched from here.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::clock::Clock;
use crate::core::types::SkillId;
use crate::engine::events::{EngineEvent, EventSink};
use crate::engine::state::TimerView;
use crate::ledger::TrainingInterval;

pub(crate) fn spawn_countdown(
    interval: TrainingInterval,
    clock: Arc<dyn Clock>,
    period: Duration,
    events: EventSink,
    expired: mpsc::UnboundedSender<SkillId>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let view = TimerView::compute(&interval, clock.now());
            let done = !view.is_active;
            events.emit(EngineEvent::Tick(view));

            if done {
                tracing::debug!(skill = %interval.skill_id, "countdown reached zero");
                // Closed receiver means the engine detached
                let _ = expired.send(interval.skill_id.clone());
                break;
            }
        }
    })
}

/// Signal `skill` again after `delay`
pub(crate) fn spawn_retry(skill: SkillId, delay: Duration, expired: mpsc::UnboundedSender<SkillId>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        tracing::debug!(skill = %skill, "retrying completion");
        let _ = expired.send(skill);
    })
}
