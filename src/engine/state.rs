//! Per-skill training state machine and the derived timer view
//!
//! ```text
//! Idle --start--> Running --(end_time <= now)--> Completable --credit--> Idle
//!                    ^                                          |
//!                    +------------- credit + auto-train --------+
//! ```
//!
//! `Running -> Completable` needs no write: it is read off the persisted end
//! time, so every observer reaches the same answer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::SkillDefinition;
use crate::core::types::SkillId;
use crate::ledger::TrainingInterval;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrainingState {
    /// No ledger entry
    #[default]
    Idle,
    /// Entry present, end time in the future
    Running(TrainingInterval),
    /// Entry present, end time reached, not yet credited
    Completable(TrainingInterval),
}

impl TrainingState {
    /// Classify a ledger entry at `now`
    pub fn observe(interval: Option<&TrainingInterval>, now: DateTime<Utc>) -> Self {
        match interval {
            None => TrainingState::Idle,
            Some(interval) if interval.is_completable(now) => TrainingState::Completable(interval.clone()),
            Some(interval) => TrainingState::Running(interval.clone()),
        }
    }

    pub fn interval(&self) -> Option<&TrainingInterval> {
        match self {
            TrainingState::Idle => None,
            TrainingState::Running(interval) | TrainingState::Completable(interval) => Some(interval),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TrainingState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TrainingState::Running(_))
    }
}

/// Progress-bar data for one skill. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerView {
    pub skill_id: SkillId,
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub progress_percent: f64,
    pub is_active: bool,
}

fn ceil_seconds(millis: i64) -> u64 {
    let millis = millis.max(0) as u64;
    millis.div_ceil(1000)
}

impl TimerView {
    /// Compute the view of `interval` at `now`
    pub fn compute(interval: &TrainingInterval, now: DateTime<Utc>) -> Self {
        let total_ms = interval.total().num_milliseconds();
        let elapsed_ms = interval.elapsed(now).num_milliseconds();
        let remaining_ms = interval.remaining(now).num_milliseconds();

        let progress_percent = if total_ms <= 0 {
            100.0
        } else {
            (elapsed_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
        };

        Self {
            skill_id: interval.skill_id.clone(),
            remaining_seconds: ceil_seconds(remaining_ms),
            total_seconds: ceil_seconds(total_ms),
            progress_percent,
            is_active: !interval.is_completable(now),
        }
    }

    /// View of a skill nobody is training
    pub fn idle(skill: &SkillDefinition) -> Self {
        Self {
            skill_id: skill.id.clone(),
            remaining_seconds: skill.interval_seconds,
            total_seconds: skill.interval_seconds,
            progress_percent: 0.0,
            is_active: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn interval(now: DateTime<Utc>) -> TrainingInterval {
        TrainingInterval::starting(&SkillDefinition::new("woodcutting", "Woodcutting", 10, 60), now).unwrap()
    }

    #[test]
    fn test_observe_states() {
        let now = Utc::now();
        let running = interval(now);
        assert!(TrainingState::observe(None, now).is_idle());
        assert!(TrainingState::observe(Some(&running), now).is_running());
        assert!(matches!(
            TrainingState::observe(Some(&running), running.end_time),
            TrainingState::Completable(_)
        ));
    }

    #[test]
    fn test_fresh_view_is_full() {
        let now = Utc::now();
        let view = TimerView::compute(&interval(now), now);
        assert_eq!(view.remaining_seconds, 60);
        assert_eq!(view.total_seconds, 60);
        assert_eq!(view.progress_percent, 0.0);
        assert!(view.is_active);
    }

    #[test]
    fn test_view_rounds_remaining_up() {
        let now = Utc::now();
        let view = TimerView::compute(&interval(now), now + Duration::milliseconds(30_500));
        assert_eq!(view.remaining_seconds, 30);
        let view = TimerView::compute(&interval(now), now + Duration::milliseconds(29_500));
        assert_eq!(view.remaining_seconds, 31);
    }

    #[test]
    fn test_expired_view_is_clamped() {
        let now = Utc::now();
        let view = TimerView::compute(&interval(now), now + Duration::hours(4));
        assert_eq!(view.remaining_seconds, 0);
        assert_eq!(view.progress_percent, 100.0);
        assert!(!view.is_active);
    }

    #[test]
    fn test_malformed_interval_view() {
        let now = Utc::now();
        let mut broken = interval(now);
        broken.end_time = broken.start_time - Duration::seconds(10);
        let view = TimerView::compute(&broken, now);
        assert_eq!(view.remaining_seconds, 0);
        assert_eq!(view.total_seconds, 0);
        assert_eq!(view.progress_percent, 100.0);
        assert!(!view.is_active);
    }

    #[test]
    fn test_idle_view() {
        let skill = SkillDefinition::new("fishing", "Fishing", 8, 45);
        let view = TimerView::idle(&skill);
        assert_eq!(view.remaining_seconds, 45);
        assert!(!view.is_active);
    }
}
