//! Training interval - one persisted start/end pair for a (user, skill) slot

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::SkillDefinition;
use crate::core::types::{IntervalId, SkillId};

/// An in-progress training session as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingInterval {
    /// Identity used to deduplicate credits
    pub interval_id: IntervalId,
    pub skill_id: SkillId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Base experience captured when the interval was armed
    #[serde(rename = "baseExp")]
    pub base_exp_snapshot: u64,
}

impl TrainingInterval {
    /// Arm a fresh interval for `skill` starting at `now`.
    ///
    /// `None` when the end time falls outside the representable calendar.
    pub fn starting(skill: &SkillDefinition, now: DateTime<Utc>) -> Option<Self> {
        let end_time = now.checked_add_signed(skill.interval())?;
        Some(Self {
            interval_id: IntervalId::new(),
            skill_id: skill.id.clone(),
            start_time: now,
            end_time,
            base_exp_snapshot: skill.base_exp,
        })
    }

    /// Expired intervals are completable; an end time equal to `now` counts
    pub fn is_completable(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }

    /// Time left, never negative
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.end_time - now).max(Duration::zero())
    }

    /// Full length, never negative even for a malformed record
    pub fn total(&self) -> Duration {
        (self.end_time - self.start_time).max(Duration::zero())
    }

    /// Time elapsed since start, clamped to `0..=total`
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_time).max(Duration::zero()).min(self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn woodcutting() -> SkillDefinition {
        SkillDefinition::new("woodcutting", "Woodcutting", 10, 60)
    }

    #[test]
    fn test_starting_sets_end_time() {
        let now = Utc::now();
        let interval = TrainingInterval::starting(&woodcutting(), now).unwrap();
        assert_eq!(interval.start_time, now);
        assert_eq!(interval.end_time, now + Duration::seconds(60));
        assert_eq!(interval.base_exp_snapshot, 10);
    }

    #[test]
    fn test_end_equal_to_now_is_completable() {
        let now = Utc::now();
        let interval = TrainingInterval::starting(&woodcutting(), now).unwrap();
        assert!(!interval.is_completable(now + Duration::seconds(59)));
        assert!(interval.is_completable(interval.end_time));
    }

    #[test]
    fn test_remaining_clamps_to_zero() {
        let now = Utc::now();
        let interval = TrainingInterval::starting(&woodcutting(), now).unwrap();
        assert_eq!(interval.remaining(now + Duration::hours(3)), Duration::zero());
    }

    #[test]
    fn test_malformed_interval_has_zero_total() {
        let now = Utc::now();
        let mut interval = TrainingInterval::starting(&woodcutting(), now).unwrap();
        interval.end_time = now - Duration::seconds(30);
        assert_eq!(interval.total(), Duration::zero());
        assert_eq!(interval.elapsed(now), Duration::zero());
    }

    #[test]
    fn test_end_time_past_calendar_is_refused() {
        let skill = SkillDefinition::new("woodcutting", "Woodcutting", 10, 60);
        assert!(TrainingInterval::starting(&skill, DateTime::<Utc>::MAX_UTC).is_none());

        let mut huge = woodcutting();
        huge.interval_seconds = u64::MAX;
        let interval = TrainingInterval::starting(&huge, Utc::now()).unwrap();
        assert_eq!(interval.total(), Duration::seconds(crate::catalog::MAX_INTERVAL_SECONDS as i64));
    }

    #[test]
    fn test_document_field_names() {
        let interval = TrainingInterval::starting(&woodcutting(), Utc::now()).unwrap();
        let json = serde_json::to_value(&interval).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("endTime").is_some());
        assert_eq!(json["skillId"], "woodcutting");
        assert_eq!(json["baseExp"], 10);
    }
}
