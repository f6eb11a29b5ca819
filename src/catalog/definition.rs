//! Skill definitions - what training a skill yields
//!
//! Definitions are owned by configuration. The engine only reads them.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::core::types::{ItemId, SkillId};

/// Longest training interval a skill may declare (one year)
pub const MAX_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// A trainable skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Unique identifier
    pub id: SkillId,
    /// Human-readable name
    pub name: String,
    /// Experience per completed interval before the level bonus
    pub base_exp: u64,
    /// Length of one training interval (seconds)
    pub interval_seconds: u64,
    /// Items rolled at the common chance
    pub common_drops: Vec<ItemId>,
    /// Items rolled at the rare chance
    pub rare_drops: Vec<ItemId>,
}

impl SkillDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_exp: u64, interval_seconds: u64) -> Self {
        Self {
            id: SkillId::new(id),
            name: name.into(),
            base_exp,
            interval_seconds,
            common_drops: Vec::new(),
            rare_drops: Vec::new(),
        }
    }

    pub fn with_common_drops<I: Into<ItemId>>(mut self, items: impl IntoIterator<Item = I>) -> Self {
        self.common_drops = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rare_drops<I: Into<ItemId>>(mut self, items: impl IntoIterator<Item = I>) -> Self {
        self.rare_drops = items.into_iter().map(Into::into).collect();
        self
    }

    /// Interval length as a duration, capped at [`MAX_INTERVAL_SECONDS`]
    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_seconds.min(MAX_INTERVAL_SECONDS) as i64)
    }
}

/// Immutable catalog of all trainable skills
#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: Vec<SkillDefinition>,
}

impl SkillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in skills used when no catalog file is supplied
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();

        catalog.add(
            SkillDefinition::new("woodcutting", "Woodcutting", 10, 60)
                .with_common_drops(["logs", "oak_logs"])
                .with_rare_drops(["bird_nest"]),
        );

        catalog.add(
            SkillDefinition::new("mining", "Mining", 12, 90)
                .with_common_drops(["copper_ore", "tin_ore"])
                .with_rare_drops(["uncut_gem"]),
        );

        catalog.add(
            SkillDefinition::new("fishing", "Fishing", 8, 45)
                .with_common_drops(["raw_shrimp"])
                .with_rare_drops(["pearl"]),
        );

        catalog
    }

    /// Add a skill, replacing any existing definition with the same id
    pub fn add(&mut self, skill: SkillDefinition) {
        match self.skills.iter_mut().find(|s| s.id == skill.id) {
            Some(existing) => *existing = skill,
            None => self.skills.push(skill),
        }
    }

    /// Get a skill by ID
    pub fn get(&self, id: &SkillId) -> Option<&SkillDefinition> {
        self.skills.iter().find(|s| &s.id == id)
    }

    pub fn contains(&self, id: &SkillId) -> bool {
        self.get(id).is_some()
    }

    /// Get all skills
    pub fn all(&self) -> &[SkillDefinition] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
