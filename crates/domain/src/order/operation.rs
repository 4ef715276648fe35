//! Line-item change batches and their normalization.
//!
//! A batch carries three raw lists (removals, quantity updates, additions).
//! [`normalize`] collapses them into exactly one [`Operation`] per catalog
//! item using fixed precedence rules:
//!
//! 1. every removal seeds a `Remove`;
//! 2. an update is recorded only if its item has no entry yet, so a removal
//!    shadows updates and the *first* update of an item wins;
//! 3. an addition turns a pending `Remove` into `Update(quantity)`, and
//!    otherwise records `Add(quantity)`, so the *last* addition wins.

use std::collections::BTreeMap;

use common::ItemId;
use serde::{Deserialize, Serialize};

/// A resolved instruction for one catalog item within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Drop the item's line.
    Remove,

    /// Set the line's quantity, creating the line if absent.
    Update(i64),

    /// Increase the line's quantity, creating the line if absent.
    Add(i64),
}

impl Operation {
    /// Returns the quantity carried by the operation, if any.
    pub fn quantity(&self) -> Option<i64> {
        match self {
            Operation::Remove => None,
            Operation::Update(quantity) | Operation::Add(quantity) => Some(*quantity),
        }
    }

    /// Returns true for `Remove`.
    pub fn is_remove(&self) -> bool {
        matches!(self, Operation::Remove)
    }
}

/// Normalized batch: one operation per catalog item, iterated in item order.
pub type OperationMap = BTreeMap<ItemId, Operation>;

/// A raw `(item, quantity)` pair as submitted by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub item_id: ItemId,
    pub quantity: i64,
}

impl LineChange {
    pub fn new(item_id: ItemId, quantity: i64) -> Self {
        Self { item_id, quantity }
    }
}

/// The full set of line-item instructions submitted in one update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemBatch {
    /// Items whose lines should be dropped.
    #[serde(default)]
    pub remove_ids: Vec<ItemId>,

    /// Quantity replacements.
    #[serde(default)]
    pub updates: Vec<LineChange>,

    /// Quantity increments (or new lines).
    #[serde(default)]
    pub adds: Vec<LineChange>,
}

impl LineItemBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to remove.
    pub fn remove(mut self, item_id: ItemId) -> Self {
        self.remove_ids.push(item_id);
        self
    }

    /// Adds a quantity update.
    pub fn update(mut self, item_id: ItemId, quantity: i64) -> Self {
        self.updates.push(LineChange::new(item_id, quantity));
        self
    }

    /// Adds a quantity addition.
    pub fn add(mut self, item_id: ItemId, quantity: i64) -> Self {
        self.adds.push(LineChange::new(item_id, quantity));
        self
    }

    /// Returns true if the batch carries no instruction at all.
    pub fn is_empty(&self) -> bool {
        self.remove_ids.is_empty() && self.updates.is_empty() && self.adds.is_empty()
    }

    /// Iterates over every supplied quantity change (updates then adds).
    pub fn changes(&self) -> impl Iterator<Item = &LineChange> {
        self.updates.iter().chain(self.adds.iter())
    }
}

/// Collapses a batch into one operation per catalog item.
pub fn normalize(batch: &LineItemBatch) -> OperationMap {
    let mut ops = OperationMap::new();

    for item_id in &batch.remove_ids {
        ops.insert(*item_id, Operation::Remove);
    }

    for change in &batch.updates {
        ops.entry(change.item_id)
            .or_insert(Operation::Update(change.quantity));
    }

    for change in &batch.adds {
        let op = match ops.get(&change.item_id) {
            Some(Operation::Remove) => Operation::Update(change.quantity),
            _ => Operation::Add(change.quantity),
        };
        ops.insert(change.item_id, op);
    }

    ops
}
