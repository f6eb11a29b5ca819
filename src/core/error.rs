use thiserror::Error;

use crate::catalog::CatalogError;
use crate::core::types::SkillId;
use crate::ledger::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown skill: {0}")]
    UnknownSkill(SkillId),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Interval of skill '{0}' does not fit the calendar")]
    IntervalOverflow(SkillId),
}

impl EngineError {
    /// Whether retrying the same operation later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Store(StoreError::Unavailable(_)))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
