//! Order aggregate root.

use chrono::{DateTime, Utc};
use common::{ItemId, LineId, OrderId, UserId, Version};
use serde::{Deserialize, Serialize};

use super::{
    LineItem, Money, OperationMap, OrderError, OrderStatus, PriceLookup, ReconcileOutcome,
    TotalChange, calculate_total, reconcile,
};

/// Result of applying one normalized batch to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Line-level changes.
    pub lines: ReconcileOutcome,

    /// Movement of the stored total.
    pub total: TotalChange,
}

impl BatchOutcome {
    fn untouched() -> Self {
        Self {
            lines: ReconcileOutcome::default(),
            total: TotalChange::Unchanged,
        }
    }
}

/// Order aggregate root.
///
/// Owns its line items exclusively. `total` is derived and is only ever
/// written by [`Order::apply_batch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    id: OrderId,

    /// User who placed the order.
    user_id: UserId,

    /// Current status.
    status: OrderStatus,

    /// When the order was placed.
    order_date: DateTime<Utc>,

    /// Σ price × quantity over the current lines.
    total: Money,

    /// Line items in insertion order.
    items: Vec<LineItem>,

    /// Stored version for optimistic concurrency.
    #[serde(default)]
    version: Version,
}

impl Order {
    /// Creates an empty, never-persisted order.
    pub fn new(
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        order_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            order_date,
            total: Money::zero(),
            items: Vec::new(),
            version: Version::initial(),
        }
    }

    /// Rebuilds an order from stored state.
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        order_date: DateTime<Utc>,
        total: Money,
        items: Vec<LineItem>,
        version: Version,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            order_date,
            total,
            items,
            version,
        }
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the user ID.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the order date.
    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    /// Returns the stored total.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the line items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the line for a catalog item.
    pub fn get_item(&self, item_id: ItemId) -> Option<&LineItem> {
        self.items.iter().find(|line| line.item_id == item_id)
    }

    /// Returns the number of lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Returns true if the order has lines.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns the stored version.
    pub fn version(&self) -> Version {
        self.version
    }
}

// Mutations
impl Order {
    /// Reconciles the lines against `ops` and recomputes the total.
    ///
    /// Works on a copy of the lines and commits only when both steps
    /// succeed, so a failed batch leaves the order untouched. An empty map
    /// changes nothing and skips recomputation.
    pub fn apply_batch(
        &mut self,
        ops: &OperationMap,
        prices: &impl PriceLookup,
    ) -> Result<BatchOutcome, OrderError> {
        if ops.is_empty() {
            return Ok(BatchOutcome::untouched());
        }

        let mut items = self.items.clone();
        let lines = reconcile(&mut items, ops)?;
        let total = calculate_total(&items, prices)?;

        let change = TotalChange::between(self.total, total);
        self.items = items;
        if change.is_changed() {
            self.total = total;
        }

        Ok(BatchOutcome {
            lines,
            total: change,
        })
    }

    /// Gives every not-yet-persisted line its identity.
    pub fn assign_line_ids(&mut self) {
        for line in self.items.iter_mut().filter(|line| line.line_id.is_none()) {
            line.line_id = Some(LineId::new());
        }
    }

    /// Reassigns the order to another user.
    pub fn set_user_id(&mut self, user_id: UserId) {
        self.user_id = user_id;
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    /// Sets the order date.
    pub fn set_order_date(&mut self, order_date: DateTime<Utc>) {
        self.order_date = order_date;
    }

    /// Records the version assigned by the store.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::order::{LineItemBatch, Operation, normalize};

    fn id(value: i64) -> ItemId {
        ItemId::new(value)
    }

    fn order_with(lines: &[(i64, i64)], prices: &HashMap<ItemId, Money>) -> Order {
        let mut order = Order::new(
            OrderId::new(),
            UserId::new(),
            OrderStatus::Created,
            Utc::now(),
        );
        let batch = lines
            .iter()
            .fold(LineItemBatch::new(), |batch, &(item, qty)| {
                batch.add(id(item), qty)
            });
        order.apply_batch(&normalize(&batch), prices).unwrap();
        order
    }

    fn catalog() -> HashMap<ItemId, Money> {
        HashMap::from([
            (id(1), Money::from_cents(1000)),
            (id(2), Money::from_cents(500)),
            (id(3), Money::from_cents(250)),
        ])
    }

    fn pairs(order: &Order) -> Vec<(i64, i64)> {
        order
            .items()
            .iter()
            .map(|line| (line.item_id.as_i64(), line.quantity))
            .collect()
    }

    #[test]
    fn test_new_order_is_empty() {
        let order = Order::new(
            OrderId::new(),
            UserId::new(),
            OrderStatus::Created,
            Utc::now(),
        );
        assert!(!order.has_items());
        assert!(order.total().is_zero());
        assert_eq!(order.version(), Version::initial());
    }

    #[test]
    fn test_remove_and_add_recomputes_total() {
        let prices = catalog();
        let mut order = order_with(&[(1, 2), (2, 1)], &prices);
        assert_eq!(order.total(), Money::from_cents(2500));

        let batch = LineItemBatch::new().remove(id(2)).add(id(3), 4);
        let outcome = order.apply_batch(&normalize(&batch), &prices).unwrap();

        assert_eq!(pairs(&order), vec![(1, 2), (3, 4)]);
        assert_eq!(order.total(), Money::from_cents(3000));
        assert_eq!(
            outcome.total,
            TotalChange::Changed {
                previous: Money::from_cents(2500),
                current: Money::from_cents(3000),
            }
        );
        assert_eq!(outcome.lines.added, 1);
        assert_eq!(outcome.lines.removed, 1);
    }

    #[test]
    fn test_total_uses_current_prices() {
        let mut prices = catalog();
        let mut order = order_with(&[(1, 1)], &prices);
        assert_eq!(order.total(), Money::from_cents(1000));

        prices.insert(id(1), Money::from_cents(1200));
        let ops = OperationMap::from([(id(2), Operation::Add(1))]);
        order.apply_batch(&ops, &prices).unwrap();
        assert_eq!(order.total(), Money::from_cents(1700));
    }

    #[test]
    fn test_unchanged_total_is_reported() {
        let prices = catalog();
        let mut order = order_with(&[(1, 2)], &prices);
        let ops = OperationMap::from([(id(1), Operation::Update(2))]);
        let outcome = order.apply_batch(&ops, &prices).unwrap();
        assert_eq!(outcome.total, TotalChange::Unchanged);
        assert_eq!(outcome.lines.updated, 1);
    }

    #[test]
    fn test_empty_batch_skips_everything() {
        let prices = catalog();
        let mut order = order_with(&[(1, 2)], &prices);
        let before = order.clone();
        let outcome = order.apply_batch(&OperationMap::new(), &HashMap::new()).unwrap();
        assert!(outcome.lines.is_noop());
        assert_eq!(order, before);
    }

    #[test]
    fn test_failed_batch_leaves_order_untouched() {
        let prices = catalog();
        let mut order = order_with(&[(1, 2), (2, 1)], &prices);
        let before = order.clone();

        let ops = OperationMap::from([(id(2), Operation::Remove), (id(1), Operation::Update(0))]);
        assert!(order.apply_batch(&ops, &prices).is_err());
        assert_eq!(order, before);

        let ops = OperationMap::from([(id(2), Operation::Remove), (id(9), Operation::Add(1))]);
        let err = order.apply_batch(&ops, &prices).unwrap_err();
        assert!(matches!(err, OrderError::PriceMissing { .. }));
        assert_eq!(order, before);
    }

    #[test]
    fn test_assign_line_ids_keeps_existing_ids() {
        let prices = catalog();
        let mut order = order_with(&[(1, 1)], &prices);
        order.assign_line_ids();
        let first = order.items()[0].line_id;
        assert!(first.is_some());

        order
            .apply_batch(&OperationMap::from([(id(2), Operation::Add(1))]), &prices)
            .unwrap();
        assert!(order.items()[1].line_id.is_none());
        order.assign_line_ids();
        assert_eq!(order.items()[0].line_id, first);
        assert!(order.items()[1].line_id.is_some());
    }

    #[test]
    fn test_query_helpers() {
        let prices = catalog();
        let order = order_with(&[(1, 2), (3, 5)], &prices);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_quantity(), 7);
        assert_eq!(order.get_item(id(3)).map(|line| line.quantity), Some(5));
        assert!(order.get_item(id(2)).is_none());
    }
}
