//! Order commands.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId, Version};

use super::{LineChange, LineItemBatch, OrderStatus, PaymentStatus};

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The order ID to create.
    pub order_id: OrderId,

    /// The user placing the order.
    pub user_id: UserId,

    /// Initial status.
    pub status: OrderStatus,

    /// When the order was placed; defaults to now.
    pub order_date: Option<DateTime<Utc>>,

    /// Requested lines. Repeated items are merged.
    pub items: Vec<LineChange>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a generated order ID.
    pub fn new(user_id: UserId, items: Vec<LineChange>) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id,
            status: OrderStatus::Created,
            order_date: None,
            items,
        }
    }

    /// Sets the initial status.
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the order date.
    pub fn with_order_date(mut self, order_date: DateTime<Utc>) -> Self {
        self.order_date = Some(order_date);
        self
    }
}

/// Command to patch an order's header and line items in one batch.
#[derive(Debug, Clone)]
pub struct UpdateOrder {
    /// The order to update.
    pub order_id: OrderId,

    /// New owner, if changing.
    pub user_id: Option<UserId>,

    /// New status, if changing.
    pub status: Option<OrderStatus>,

    /// New order date, if changing.
    pub order_date: Option<DateTime<Utc>>,

    /// Version the client last saw; the update is rejected if the stored
    /// order has moved on.
    pub expected_version: Option<Version>,

    /// Line-item instructions.
    pub batch: LineItemBatch,
}

impl UpdateOrder {
    /// Creates a new UpdateOrder command carrying only line-item changes.
    pub fn new(order_id: OrderId, batch: LineItemBatch) -> Self {
        Self {
            order_id,
            user_id: None,
            status: None,
            order_date: None,
            expected_version: None,
            batch,
        }
    }

    /// Reassigns the order to another user.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Changes the status.
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Changes the order date.
    pub fn with_order_date(mut self, order_date: DateTime<Utc>) -> Self {
        self.order_date = Some(order_date);
        self
    }

    /// Requires the stored order to be at `version`.
    pub fn expecting_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Command carrying a payment result for an order.
#[derive(Debug, Clone, Copy)]
pub struct RecordPayment {
    /// The order that was paid for.
    pub order_id: OrderId,

    /// Outcome of the payment.
    pub payment_status: PaymentStatus,
}

impl RecordPayment {
    /// Creates a new RecordPayment command.
    pub fn new(order_id: OrderId, payment_status: PaymentStatus) -> Self {
        Self {
            order_id,
            payment_status,
        }
    }
}
