//! Value objects for the order domain.

use common::{ItemId, LineId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exact monetary amount.
///
/// Backed by a fixed-point decimal so that `price × quantity` sums never
/// drift the way binary floating point does. Serialized as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a money amount from a decimal value.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a money amount from cents (e.g., 1050 = 10.50).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Adds another amount, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_multiply(&self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_negative() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<Decimal>().map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// One `(catalog item, quantity)` row of an order.
///
/// `line_id` stays `None` until the owning order assigns identities
/// right before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Row identity, absent for rows that were never persisted.
    pub line_id: Option<LineId>,

    /// The priced catalog entry this row refers to.
    pub item_id: ItemId,

    /// Ordered quantity, always greater than zero.
    pub quantity: i64,
}

impl LineItem {
    /// Creates a not-yet-persisted line item.
    pub fn new(item_id: ItemId, quantity: i64) -> Self {
        Self {
            line_id: None,
            item_id,
            quantity,
        }
    }

    /// Creates a line item that already has a row identity.
    pub fn with_line_id(line_id: LineId, item_id: ItemId, quantity: i64) -> Self {
        Self {
            line_id: Some(line_id),
            item_id,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.amount(), Decimal::new(1234, 2));
        assert_eq!(money.to_string(), "$12.34");
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_equality_ignores_scale() {
        let a: Money = "10.0".parse().unwrap();
        let b: Money = "10.00".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_money_exact_arithmetic() {
        let price: Money = "0.10".parse().unwrap();
        let mut total = Money::zero();
        for _ in 0..3 {
            total = total.checked_add(price).unwrap();
        }
        assert_eq!(total, "0.30".parse().unwrap());
        assert_eq!(
            Money::from_cents(250).checked_multiply(4),
            Some(Money::from_cents(1000))
        );
    }

    #[test]
    fn test_money_overflow_is_reported() {
        let huge = Money::new(Decimal::MAX);
        assert!(huge.checked_add(Money::from_cents(100)).is_none());
        assert!(huge.checked_multiply(2).is_none());
    }

    #[test]
    fn test_money_sign_checks() {
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }

    #[test]
    fn test_money_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(2500)).unwrap();
        assert_eq!(json, "\"25.00\"");
    }

    #[test]
    fn test_new_line_item_has_no_identity() {
        let line = LineItem::new(ItemId::new(3), 4);
        assert!(line.line_id.is_none());
        assert_eq!(line.quantity, 4);
    }
}
