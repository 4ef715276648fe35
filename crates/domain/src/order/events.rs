//! Order domain events published to outside consumers.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, Order};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone {
    /// Returns the event type name, used as the routing key.
    fn event_type(&self) -> &'static str;
}

/// Events emitted by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created.
    OrderCreated(OrderCreatedData),

    /// Order header or line items changed.
    OrderUpdated(OrderUpdatedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::OrderUpdated(_) => "OrderUpdated",
        }
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    /// The new order.
    pub order_id: OrderId,

    /// Its owner.
    pub user_id: UserId,

    /// Amount due.
    pub total: Money,

    /// When the order was placed.
    pub order_date: DateTime<Utc>,
}

/// Data for OrderUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdatedData {
    /// The updated order.
    pub order_id: OrderId,

    /// Its owner after the update.
    pub user_id: UserId,

    /// Amount due after the update.
    pub total: Money,
}

impl OrderEvent {
    /// Builds an OrderCreated event from a freshly stored order.
    pub fn order_created(order: &Order) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData {
            order_id: order.id(),
            user_id: order.user_id(),
            total: order.total(),
            order_date: order.order_date(),
        })
    }

    /// Builds an OrderUpdated event from a freshly stored order.
    pub fn order_updated(order: &Order) -> Self {
        OrderEvent::OrderUpdated(OrderUpdatedData {
            order_id: order.id(),
            user_id: order.user_id(),
            total: order.total(),
        })
    }

    /// Returns the order the event is about.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderCreated(data) => data.order_id,
            OrderEvent::OrderUpdated(data) => data.order_id,
        }
    }
}
