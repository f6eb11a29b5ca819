//! Local "credit in progress" set
//!
//! A skill is marked before its completion transaction starts and unmarked
//! when the guard drops, whether the transaction succeeded, failed, or the
//! future was cancelled.

use ahash::AHashSet;
use std::sync::{Arc, Mutex};

use crate::core::types::SkillId;

#[derive(Debug, Clone, Default)]
pub struct InFlight {
    skills: Arc<Mutex<AHashSet<SkillId>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `skill` in flight. `None` if it already is.
    pub fn try_acquire(&self, skill: &SkillId) -> Option<InFlightGuard> {
        let mut skills = self.skills.lock().unwrap_or_else(|e| e.into_inner());
        if !skills.insert(skill.clone()) {
            return None;
        }
        Some(InFlightGuard {
            skills: Arc::clone(&self.skills),
            skill: skill.clone(),
        })
    }

    #[cfg(test)]
    pub fn contains(&self, skill: &SkillId) -> bool {
        self.skills.lock().unwrap_or_else(|e| e.into_inner()).contains(skill)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    skills: Arc<Mutex<AHashSet<SkillId>>>,
    skill: SkillId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.skills
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.skill);
    }
}
