//! Skill catalog - static definitions read by the engine

pub mod definition;
pub mod loader;

pub use definition::{SkillCatalog, SkillDefinition, MAX_INTERVAL_SECONDS};
pub use loader::CatalogError;
