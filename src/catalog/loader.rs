//! TOML catalog loading
//!
//! ```toml
//! [[skills]]
//! id = "woodcutting"
//! name = "Woodcutting"
//! base_exp = 10
//! interval_seconds = 60
//! common_drops = ["logs"]
//! rare_drops = ["bird_nest"]
//! ```
//!
//! Missing `base_exp` and `interval_seconds` fall back to 10 and 60.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::catalog::definition::{SkillCatalog, SkillDefinition, MAX_INTERVAL_SECONDS};
use crate::core::types::{ItemId, SkillId};

const DEFAULT_BASE_EXP: u64 = 10;
const DEFAULT_INTERVAL_SECONDS: u64 = 60;

/// Error type for catalog loading
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid skill '{skill}': {reason}")]
    Invalid { skill: String, reason: String },
}

/// TOML representation of a catalog file
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    skills: Vec<TomlSkill>,
}

/// TOML representation of a single skill
#[derive(Debug, Deserialize)]
struct TomlSkill {
    id: String,
    name: Option<String>,
    #[serde(default = "default_base_exp")]
    base_exp: u64,
    #[serde(default = "default_interval_seconds")]
    interval_seconds: u64,
    #[serde(default)]
    common_drops: Vec<String>,
    #[serde(default)]
    rare_drops: Vec<String>,
}

fn default_base_exp() -> u64 {
    DEFAULT_BASE_EXP
}

fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

impl TomlSkill {
    fn into_definition(self) -> Result<SkillDefinition, CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::Invalid {
                skill: self.id,
                reason: "id must not be empty".into(),
            });
        }
        if self.interval_seconds == 0 {
            return Err(CatalogError::Invalid {
                skill: self.id,
                reason: "interval_seconds must be positive".into(),
            });
        }
        if self.interval_seconds > MAX_INTERVAL_SECONDS {
            return Err(CatalogError::Invalid {
                skill: self.id,
                reason: format!("interval_seconds must not exceed {}", MAX_INTERVAL_SECONDS),
            });
        }

        Ok(SkillDefinition {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: SkillId(self.id),
            base_exp: self.base_exp,
            interval_seconds: self.interval_seconds,
            common_drops: self.common_drops.into_iter().map(ItemId).collect(),
            rare_drops: self.rare_drops.into_iter().map(ItemId).collect(),
        })
    }
}

impl SkillCatalog {
    /// Load skills from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse skills from TOML string
    pub fn parse_toml(content: &str) -> Result<Self, CatalogError> {
        let toml_data: TomlCatalog =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut catalog = Self::new();
        for skill in toml_data.skills {
            let definition = skill.into_definition()?;
            if catalog.contains(&definition.id) {
                return Err(CatalogError::Invalid {
                    skill: definition.id.0,
                    reason: "duplicate id".into(),
                });
            }
            catalog.add(definition);
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_skill() {
        let catalog = SkillCatalog::parse_toml(
            r#"
            [[skills]]
            id = "woodcutting"
            name = "Woodcutting"
            base_exp = 10
            interval_seconds = 60
            common_drops = ["logs"]
            rare_drops = ["bird_nest"]
            "#,
        )
        .unwrap();

        let skill = catalog.get(&"woodcutting".into()).unwrap();
        assert_eq!(skill.name, "Woodcutting");
        assert_eq!(skill.common_drops, vec![ItemId::new("logs")]);
        assert_eq!(skill.rare_drops, vec![ItemId::new("bird_nest")]);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let catalog = SkillCatalog::parse_toml("[[skills]]\nid = \"fishing\"\n").unwrap();
        let skill = catalog.get(&"fishing".into()).unwrap();
        assert_eq!(skill.base_exp, DEFAULT_BASE_EXP);
        assert_eq!(skill.interval_seconds, DEFAULT_INTERVAL_SECONDS);
        assert_eq!(skill.name, "fishing");
        assert!(skill.common_drops.is_empty());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = SkillCatalog::parse_toml("[[skills]]\nid = \"x\"\ninterval_seconds = 0\n").unwrap_err();
        assert!(matches!(err, CatalogError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_interval_beyond_a_year() {
        let err = SkillCatalog::parse_toml("[[skills]]\nid = \"x\"\ninterval_seconds = 10000000000000\n").unwrap_err();
        assert!(matches!(err, CatalogError::Invalid { .. }));

        let toml = format!("[[skills]]\nid = \"x\"\ninterval_seconds = {}\n", MAX_INTERVAL_SECONDS);
        assert!(SkillCatalog::parse_toml(&toml).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = SkillCatalog::parse_toml("[[skills]]\nid = \"x\"\n[[skills]]\nid = \"x\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SkillCatalog::parse_toml("[[skills]\nid=").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
