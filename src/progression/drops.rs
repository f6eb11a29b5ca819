//! Drop resolution
//!
//! The common and rare tables are rolled independently. Each successful roll
//! picks one item uniformly from its table, so a completion yields zero, one
//! or two items.

use rand::Rng;

use crate::catalog::SkillDefinition;
use crate::core::config::EngineConfig;
use crate::core::types::ItemId;

/// Per-table success probabilities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropChances {
    pub common: f64,
    pub rare: f64,
}

impl DropChances {
    pub fn new(common: f64, rare: f64) -> Self {
        Self { common, rare }
    }

    /// Every roll succeeds
    pub fn always() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.common_drop_chance, config.rare_drop_chance)
    }
}

impl Default for DropChances {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn roll_table<R: Rng + ?Sized>(table: &[ItemId], chance: f64, rng: &mut R) -> Option<ItemId> {
    if table.is_empty() {
        return None;
    }
    let roll: f64 = rng.gen();
    if roll >= chance {
        return None;
    }
    Some(table[rng.gen_range(0..table.len())].clone())
}

/// Roll both drop tables of a skill
pub fn resolve_drops<R: Rng + ?Sized>(skill: &SkillDefinition, chances: DropChances, rng: &mut R) -> Vec<ItemId> {
    let mut drops = Vec::with_capacity(2);
    if let Some(item) = roll_table(&skill.common_drops, chances.common, rng) {
        drops.push(item);
    }
    if let Some(item) = roll_table(&skill.rare_drops, chances.rare, rng) {
        drops.push(item);
    }
    drops
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn skill() -> SkillDefinition {
        SkillDefinition::new("woodcutting", "Woodcutting", 10, 60)
            .with_common_drops(["logs"])
            .with_rare_drops(["bird_nest"])
    }

    #[test]
    fn test_always_hits_both_tables() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let drops = resolve_drops(&skill(), DropChances::always(), &mut rng);
        assert_eq!(drops, vec![ItemId::new("logs"), ItemId::new("bird_nest")]);
    }

    #[test]
    fn test_zero_chance_never_drops() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(resolve_drops(&skill(), DropChances::new(0.0, 0.0), &mut rng).is_empty());
        }
    }

    #[test]
    fn test_empty_tables_never_drop() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let bare = SkillDefinition::new("mining", "Mining", 10, 60);
        assert!(resolve_drops(&bare, DropChances::always(), &mut rng).is_empty());
    }

    #[test]
    fn test_common_rate_is_roughly_half() {
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let common_only = SkillDefinition::new("fishing", "Fishing", 8, 45).with_common_drops(["fish"]);
        let hits = (0..10_000)
            .filter(|_| !resolve_drops(&common_only, DropChances::default(), &mut rng).is_empty())
            .count();
        assert!((4_500..5_500).contains(&hits), "hits = {}", hits);
    }

    #[test]
    fn test_picks_from_whole_table() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let skill = SkillDefinition::new("mining", "Mining", 10, 60).with_common_drops(["a", "b", "c"]);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.extend(resolve_drops(&skill, DropChances::always(), &mut rng));
        }
        assert_eq!(seen.len(), 3);
    }
}
