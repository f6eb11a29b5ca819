//! Inventory - per-user item quantities

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::ItemId;

/// Item quantities held by one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: AHashMap<ItemId, u64>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current quantity of an item
    pub fn get(&self, item: &ItemId) -> u64 {
        self.items.get(item).copied().unwrap_or(0)
    }

    /// Add `amount` of an item, creating the entry if absent
    pub fn add(&mut self, item: ItemId, amount: u64) -> u64 {
        let entry = self.items.entry(item).or_insert(0);
        *entry = entry.saturating_add(amount);
        *entry
    }

    /// Add one of each listed item (duplicates count twice)
    pub fn merge(&mut self, items: &[ItemId]) {
        for item in items {
            self.add(item.clone(), 1);
        }
    }

    /// Total number of items held
    pub fn total(&self) -> u64 {
        self.items.values().fold(0u64, |acc, n| acc.saturating_add(*n))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, u64)> {
        self.items.iter().map(|(id, n)| (id, *n))
    }
}
