//! Order aggregate, the line-item reconciliation engine and the order service.

mod aggregate;
mod commands;
mod events;
mod operation;
mod reconcile;
mod service;
mod state;
mod total;
mod value_objects;

pub use aggregate::{BatchOutcome, Order};
pub use commands::*;
pub use events::{DomainEvent, OrderCreatedData, OrderEvent, OrderUpdatedData};
pub use operation::{LineChange, LineItemBatch, Operation, OperationMap, normalize};
pub use reconcile::{ReconcileOutcome, reconcile};
pub use service::{OrderService, UpdatedOrder};
pub use state::{OrderStatus, PaymentStatus, UnknownStatus};
pub use total::{PriceLookup, TotalChange, calculate_total, priced_item_ids};
pub use value_objects::{LineItem, Money};

use common::ItemId;
use thiserror::Error;

/// Errors raised by the order model itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// A supplied or computed quantity is not positive.
    #[error("Invalid quantity for item {item_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item_id: ItemId, quantity: i64 },

    /// A line references an item with no known price.
    #[error("No price available for item {item_id}")]
    PriceMissing { item_id: ItemId },

    /// The order total does not fit the decimal representation.
    #[error("Order total overflowed")]
    TotalOverflow,

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Order date lies in the future.
    #[error("Order date cannot be in the future")]
    OrderDateInFuture,
}
