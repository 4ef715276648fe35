//! Applies a normalized operation map to an order's line items.
//!
//! Per catalog item the engine is a two-state machine (absent / present):
//!
//! ```text
//!            Add(q) / Update(q)            Add(q): qty += q
//! absent ───────────────────────► present ◄──────────────── present
//!    ▲                               │      Update(q): qty = q
//!    └────────── Remove ─────────────┘
//! ```
//!
//! Every resulting quantity is validated before the first mutation, so a
//! rejected batch leaves the collection untouched.

use common::ItemId;

use super::{LineItem, Operation, OperationMap, OrderError};

/// Counts of line-level changes produced by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Lines created for items that were absent.
    pub added: usize,

    /// Existing lines whose quantity was set or increased.
    pub updated: usize,

    /// Lines dropped.
    pub removed: usize,
}

impl ReconcileOutcome {
    /// Returns true if no line was created, changed or dropped.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// What a single operation resolves to against the current lines.
enum Step {
    SetQuantity { index: usize, quantity: i64 },
    Insert(LineItem),
}

/// Reconciles `items` against `ops` in place.
///
/// Fails with [`OrderError::InvalidQuantity`] if any supplied or computed
/// quantity is not positive; in that case `items` is left unchanged.
pub fn reconcile(
    items: &mut Vec<LineItem>,
    ops: &OperationMap,
) -> Result<ReconcileOutcome, OrderError> {
    let steps = plan(items, ops)?;
    let mut outcome = ReconcileOutcome::default();

    for step in steps {
        match step {
            Step::SetQuantity { index, quantity } => {
                if let Some(line) = items.get_mut(index) {
                    line.quantity = quantity;
                    outcome.updated += 1;
                }
            }
            Step::Insert(line) => {
                items.push(line);
                outcome.added += 1;
            }
        }
    }

    // Removals go last so that the indices planned above stay valid.
    let before = items.len();
    let removed: Vec<ItemId> = ops
        .iter()
        .filter(|(_, op)| op.is_remove())
        .map(|(item_id, _)| *item_id)
        .collect();
    if !removed.is_empty() {
        items.retain(|line| !removed.contains(&line.item_id));
    }
    outcome.removed = before - items.len();

    Ok(outcome)
}

/// Resolves every quantity-bearing operation to a step without mutating.
fn plan(items: &[LineItem], ops: &OperationMap) -> Result<Vec<Step>, OrderError> {
    let mut steps = Vec::with_capacity(ops.len());

    for (&item_id, op) in ops {
        let step = match *op {
            Operation::Remove => continue,
            Operation::Update(quantity) | Operation::Add(quantity) => {
                ensure_positive(item_id, quantity)?;

                match items.iter().position(|line| line.item_id == item_id) {
                    Some(index) => {
                        let quantity = match *op {
                            Operation::Add(delta) => items[index]
                                .quantity
                                .checked_add(delta)
                                .ok_or(OrderError::InvalidQuantity {
                                    item_id,
                                    quantity: delta,
                                })?,
                            _ => quantity,
                        };
                        ensure_positive(item_id, quantity)?;
                        Step::SetQuantity { index, quantity }
                    }
                    None => Step::Insert(LineItem::new(item_id, quantity)),
                }
            }
        };
        steps.push(step);
    }

    Ok(steps)
}

fn ensure_positive(item_id: ItemId, quantity: i64) -> Result<(), OrderError> {
    if quantity <= 0 {
        return Err(OrderError::InvalidQuantity { item_id, quantity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{LineItemBatch, normalize};

    fn id(value: i64) -> ItemId {
        ItemId::new(value)
    }

    fn lines(pairs: &[(i64, i64)]) -> Vec<LineItem> {
        pairs
            .iter()
            .map(|&(item, quantity)| LineItem::new(id(item), quantity))
            .collect()
    }

    fn pairs(items: &[LineItem]) -> Vec<(i64, i64)> {
        items
            .iter()
            .map(|line| (line.item_id.as_i64(), line.quantity))
            .collect()
    }

    fn single(item: i64, op: Operation) -> OperationMap {
        OperationMap::from([(id(item), op)])
    }

    #[test]
    fn test_add_accumulates_existing_quantity() {
        let mut items = lines(&[(9, 2)]);
        let outcome = reconcile(&mut items, &single(9, Operation::Add(3))).unwrap();
        assert_eq!(pairs(&items), vec![(9, 5)]);
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn test_update_replaces_existing_quantity() {
        let mut items = lines(&[(9, 2)]);
        reconcile(&mut items, &single(9, Operation::Update(3))).unwrap();
        assert_eq!(pairs(&items), vec![(9, 3)]);
    }

    #[test]
    fn test_remove_deletes_only_targeted_line() {
        let mut items = lines(&[(1, 1), (2, 1), (3, 1)]);
        let outcome = reconcile(&mut items, &single(2, Operation::Remove)).unwrap();
        assert_eq!(pairs(&items), vec![(1, 1), (3, 1)]);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn test_remove_drops_every_duplicate_line() {
        let mut items = lines(&[(2, 1), (1, 1), (2, 4)]);
        let outcome = reconcile(&mut items, &single(2, Operation::Remove)).unwrap();
        assert_eq!(pairs(&items), vec![(1, 1)]);
        assert_eq!(outcome.removed, 2);
    }

    #[test]
    fn test_remove_of_absent_item_is_noop() {
        let mut items = lines(&[(1, 1)]);
        let outcome = reconcile(&mut items, &single(7, Operation::Remove)).unwrap();
        assert_eq!(pairs(&items), vec![(1, 1)]);
        assert!(outcome.is_noop());
    }

    #[test]
    fn test_update_and_add_create_missing_lines_alike() {
        let mut items = Vec::new();
        let ops = OperationMap::from([(id(4), Operation::Update(2)), (id(5), Operation::Add(3))]);
        let outcome = reconcile(&mut items, &ops).unwrap();
        assert_eq!(pairs(&items), vec![(4, 2), (5, 3)]);
        assert_eq!(outcome.added, 2);
        assert!(items.iter().all(|line| line.line_id.is_none()));
    }

    #[test]
    fn test_new_lines_are_appended_after_existing_ones() {
        let mut items = lines(&[(8, 1)]);
        reconcile(&mut items, &single(3, Operation::Add(1))).unwrap();
        assert_eq!(pairs(&items), vec![(8, 1), (3, 1)]);
    }

    #[test]
    fn test_non_positive_quantity_rejects_whole_batch() {
        let mut items = lines(&[(1, 2), (2, 1)]);
        let ops = OperationMap::from([
            (id(1), Operation::Remove),
            (id(2), Operation::Update(5)),
            (id(3), Operation::Add(0)),
        ]);

        let err = reconcile(&mut items, &ops).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidQuantity { item_id, quantity: 0 } if item_id == id(3)
        ));
        assert_eq!(pairs(&items), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_negative_update_is_rejected() {
        let mut items = lines(&[(1, 2)]);
        let result = reconcile(&mut items, &single(1, Operation::Update(-1)));
        assert!(result.is_err());
        assert_eq!(pairs(&items), vec![(1, 2)]);
    }

    #[test]
    fn test_quantity_overflow_is_rejected() {
        let mut items = lines(&[(1, i64::MAX)]);
        let result = reconcile(&mut items, &single(1, Operation::Add(1)));
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
        assert_eq!(pairs(&items), vec![(1, i64::MAX)]);
    }

    #[test]
    fn test_empty_map_is_noop() {
        let mut items = lines(&[(1, 2)]);
        let outcome = reconcile(&mut items, &OperationMap::new()).unwrap();
        assert!(outcome.is_noop());
        assert_eq!(pairs(&items), vec![(1, 2)]);
    }

    #[test]
    fn test_same_snapshot_and_batch_give_same_result() {
        let snapshot = lines(&[(1, 2), (2, 1)]);
        let batch = LineItemBatch::new()
            .remove(id(2))
            .add(id(3), 4)
            .update(id(1), 6);
        let ops = normalize(&batch);

        let mut first = snapshot.clone();
        let mut second = snapshot.clone();
        reconcile(&mut first, &ops).unwrap();
        reconcile(&mut second, &ops).unwrap();
        assert_eq!(first, second);
        assert_eq!(pairs(&first), vec![(1, 6), (3, 4)]);
    }
}
