//! Training ledger - durable per-user record of active intervals
//!
//! The ledger is the source of truth. A persisted interval is the proof that
//! a completion is owed; local timers are only observers.

pub mod interval;
pub mod inventory;
pub mod memory;
pub mod store;

pub use interval::TrainingInterval;
pub use inventory::Inventory;
pub use memory::{MemoryBackend, UserRecord};
pub use store::{
    AutoTrainingFlags, Backend, InventoryStore, LedgerSnapshot, ProgressStore, StoreError, TrainingLedger,
};
