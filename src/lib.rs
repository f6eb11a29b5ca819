//! Skillforge - timed skill training with exactly-once progression credit

pub mod catalog;
pub mod core;
pub mod engine;
pub mod ledger;
pub mod progression;

pub use crate::catalog::{SkillCatalog, SkillDefinition};
pub use crate::core::{EngineConfig, EngineError, IntervalId, ItemId, Result, SkillId, UserId};
pub use crate::engine::{CompletionOutcome, EngineEvent, ProgressionEngine, StartOutcome, TimerView, TrainingState};
pub use crate::ledger::{Backend, MemoryBackend, TrainingInterval};
