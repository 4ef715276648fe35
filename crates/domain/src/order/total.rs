//! Order total calculation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use common::ItemId;

use super::{LineItem, Money, Operation, OperationMap, OrderError};

/// Source of current catalog prices, keyed by item.
pub trait PriceLookup {
    /// Returns the current price of an item, if known.
    fn price_of(&self, item_id: ItemId) -> Option<Money>;
}

impl PriceLookup for HashMap<ItemId, Money> {
    fn price_of(&self, item_id: ItemId) -> Option<Money> {
        self.get(&item_id).copied()
    }
}

impl PriceLookup for BTreeMap<ItemId, Money> {
    fn price_of(&self, item_id: ItemId) -> Option<Money> {
        self.get(&item_id).copied()
    }
}

/// Whether a recomputed total differs from the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalChange {
    Unchanged,
    Changed { previous: Money, current: Money },
}

impl TotalChange {
    /// Compares a freshly computed total against the stored one.
    pub fn between(previous: Money, current: Money) -> Self {
        if previous == current {
            TotalChange::Unchanged
        } else {
            TotalChange::Changed { previous, current }
        }
    }

    /// Returns true if the total moved.
    pub fn is_changed(&self) -> bool {
        matches!(self, TotalChange::Changed { .. })
    }
}

/// Computes `Σ price(item) × quantity` over the given lines.
///
/// Every referenced item must have a price; arithmetic is exact and
/// overflow is reported rather than wrapped.
pub fn calculate_total(items: &[LineItem], prices: &impl PriceLookup) -> Result<Money, OrderError> {
    items.iter().try_fold(Money::zero(), |total, line| {
        let price = prices
            .price_of(line.item_id)
            .ok_or(OrderError::PriceMissing {
                item_id: line.item_id,
            })?;
        price
            .checked_multiply(line.quantity)
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or(OrderError::TotalOverflow)
    })
}

/// Distinct items whose price is needed to total an order after a batch:
/// every current line the batch keeps plus every item an `Update`/`Add`
/// may introduce.
pub fn priced_item_ids(items: &[LineItem], ops: &OperationMap) -> BTreeSet<ItemId> {
    items
        .iter()
        .map(|line| line.item_id)
        .filter(|item_id| !ops.get(item_id).is_some_and(Operation::is_remove))
        .chain(
            ops.iter()
                .filter(|(_, op)| !op.is_remove())
                .map(|(item_id, _)| *item_id),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> ItemId {
        ItemId::new(value)
    }

    fn prices(entries: &[(i64, i64)]) -> HashMap<ItemId, Money> {
        entries
            .iter()
            .map(|&(item, cents)| (id(item), Money::from_cents(cents)))
            .collect()
    }

    #[test]
    fn test_total_sums_price_times_quantity() {
        let items = vec![LineItem::new(id(1), 2), LineItem::new(id(3), 4)];
        let total = calculate_total(&items, &prices(&[(1, 1000), (3, 250)])).unwrap();
        assert_eq!(total, Money::from_cents(3000));
    }

    #[test]
    fn test_total_of_no_lines_is_zero() {
        let total = calculate_total(&[], &prices(&[])).unwrap();
        assert!(total.is_zero());
    }

    #[test]
    fn test_total_is_exact_for_fractional_prices() {
        let items = vec![LineItem::new(id(1), 3)];
        let lookup: HashMap<ItemId, Money> = HashMap::from([(id(1), "0.1".parse().unwrap())]);
        let total = calculate_total(&items, &lookup).unwrap();
        assert_eq!(total, "0.3".parse().unwrap());
    }

    #[test]
    fn test_missing_price_is_an_error() {
        let items = vec![LineItem::new(id(1), 1), LineItem::new(id(2), 1)];
        let err = calculate_total(&items, &prices(&[(1, 100)])).unwrap_err();
        assert!(matches!(err, OrderError::PriceMissing { item_id } if item_id == id(2)));
    }

    #[test]
    fn test_recomputing_twice_yields_same_total() {
        let items = vec![LineItem::new(id(1), 7), LineItem::new(id(2), 3)];
        let lookup = prices(&[(1, 199), (2, 1)]);
        let first = calculate_total(&items, &lookup).unwrap();
        let second = calculate_total(&items, &lookup).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_change_detection() {
        let ten = Money::from_cents(1000);
        assert_eq!(TotalChange::between(ten, ten), TotalChange::Unchanged);
        assert!(TotalChange::between(ten, Money::from_cents(1001)).is_changed());
        assert!(!TotalChange::between(ten, "10.0".parse().unwrap()).is_changed());
    }

    #[test]
    fn test_priced_item_ids_skip_removed_items() {
        let items = vec![LineItem::new(id(1), 1), LineItem::new(id(2), 1)];
        let ops = OperationMap::from([
            (id(2), Operation::Remove),
            (id(3), Operation::Add(1)),
            (id(4), Operation::Remove),
        ]);
        let ids: Vec<i64> = priced_item_ids(&items, &ops)
            .into_iter()
            .map(|item_id| item_id.as_i64())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
