//! Progression math - level curve, experience gain, drop rolls

pub mod drops;
pub mod level;

pub use drops::{resolve_drops, DropChances};
pub use level::{
    cumulative_exp_for_level, experience_gain, level_for_experience, required_exp_for_level, SkillProgress,
};
