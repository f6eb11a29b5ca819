//! Level curve and experience gain
//!
//! Experience is a cumulative total that only grows. Leaving level `n` costs
//! `floor(100 * 1.5^(n-1))`, so level 2 is reached at 100 experience,
//! level 3 at 250, level 4 at 475.

use serde::{Deserialize, Serialize};

/// Experience needed to advance from `level` to `level + 1`
pub fn required_exp_for_level(level: u32) -> u64 {
    let level = level.max(1);
    // `as` saturates, which caps the far end of the curve at u64::MAX
    (100.0 * 1.5f64.powi(level as i32 - 1)).floor() as u64
}

/// Total experience at which `level` is reached (level 1 starts at 0)
pub fn cumulative_exp_for_level(level: u32) -> u64 {
    (1..level.max(1)).fold(0u64, |total, l| total.saturating_add(required_exp_for_level(l)))
}

/// Largest level whose cumulative threshold has been reached, capped at `max_level`
pub fn level_for_experience(experience: u64, max_level: u32) -> u32 {
    let max_level = max_level.max(1);
    let mut level = 1;
    let mut threshold = 0u64;
    while level < max_level {
        threshold = threshold.saturating_add(required_exp_for_level(level));
        if experience < threshold {
            break;
        }
        level += 1;
    }
    level
}

/// Experience credited for one completed interval
///
/// Equal to `floor(base_exp * (1 + level * 0.1))`, computed in integers so
/// the result never lands one short because of float rounding.
pub fn experience_gain(base_exp: u64, level: u32) -> u64 {
    base_exp.saturating_mul(10 + level as u64) / 10
}

/// Persisted per-user, per-skill progress
///
/// Only the experience total is stored. Level is always derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub experience: u64,
}

impl SkillProgress {
    pub fn new(experience: u64) -> Self {
        Self { experience }
    }

    pub fn level(&self, max_level: u32) -> u32 {
        level_for_experience(self.experience, max_level)
    }

    /// Cumulative experience at which the next level is reached.
    /// `None` at the level cap.
    pub fn next_level_experience(&self, max_level: u32) -> Option<u64> {
        let level = self.level(max_level);
        (level < max_level).then(|| cumulative_exp_for_level(level + 1))
    }

    /// Fraction of the current level completed (0.0 to 1.0)
    pub fn level_progress(&self, max_level: u32) -> f64 {
        let level = self.level(max_level);
        let Some(next) = self.next_level_experience(max_level) else {
            return 1.0;
        };
        let floor = cumulative_exp_for_level(level);
        let span = next.saturating_sub(floor);
        if span == 0 {
            return 1.0;
        }
        (self.experience.saturating_sub(floor) as f64 / span as f64).clamp(0.0, 1.0)
    }
}
