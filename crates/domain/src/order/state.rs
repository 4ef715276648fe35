//! Order status and payment outcome.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status is informational for the reconciliation engine: line items can be
/// patched in any status. Payment results move an order to `Paid` or `Unpaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order was placed.
    #[default]
    Created,

    /// Order is being worked on.
    Processing,

    /// Payment succeeded.
    Paid,

    /// Payment failed.
    Unpaid,

    /// Order was fulfilled (terminal state).
    Completed,

    /// Order was canceled (terminal state).
    Canceled,
}

impl OrderStatus {
    /// Maps a payment result onto the order status it implies.
    pub fn from_payment(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Success => OrderStatus::Paid,
            PaymentStatus::Failure => OrderStatus::Unpaid,
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Processing => "Processing",
            OrderStatus::Paid => "Paid",
            OrderStatus::Unpaid => "Unpaid",
            OrderStatus::Completed => "Completed",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(OrderStatus::Created),
            "Processing" => Ok(OrderStatus::Processing),
            "Paid" => Ok(OrderStatus::Paid),
            "Unpaid" => Ok(OrderStatus::Unpaid),
            "Completed" => Ok(OrderStatus::Completed),
            "Canceled" => Ok(OrderStatus::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Outcome reported by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Success,
    Failure,
}
