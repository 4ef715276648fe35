//! Order service: sequences validation, normalization, reconciliation,
//! pricing, persistence and event publication for each order operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};

use crate::catalog::CatalogService;
use crate::error::DomainError;
use crate::services::{EventPublisher, UserDirectory};
use crate::store::{CatalogStore, OrderStore};

use super::{
    CreateOrder, LineChange, Money, Operation, OperationMap, Order, OrderError, OrderEvent,
    OrderStatus, RecordPayment, ReconcileOutcome, UpdateOrder, normalize, priced_item_ids,
};

/// Result of a successful update.
#[derive(Debug, Clone)]
pub struct UpdatedOrder {
    /// The order as stored after the update.
    pub order: Order,

    /// Whether the stored total moved.
    pub total_changed: bool,

    /// Line-level changes made by the batch.
    pub lines: ReconcileOutcome,

    /// The batch left no lines, so the order was deleted instead of written.
    pub deleted: bool,
}

/// Service for managing orders.
///
/// Generic over the order and catalog stores; the user directory and the
/// event publisher are shared trait objects.
pub struct OrderService<S: OrderStore, C: CatalogStore> {
    orders: S,
    catalog: CatalogService<C>,
    users: Arc<dyn UserDirectory>,
    publisher: Arc<dyn EventPublisher>,
}

impl<S: OrderStore, C: CatalogStore> OrderService<S, C> {
    /// Creates a new order service.
    pub fn new(
        orders: S,
        catalog: C,
        users: Arc<dyn UserDirectory>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            orders,
            catalog: CatalogService::new(catalog),
            users,
            publisher,
        }
    }

    /// Returns a reference to the underlying order store.
    pub fn store(&self) -> &S {
        &self.orders
    }

    /// Returns the catalog service used for existence and price lookups.
    pub fn catalog(&self) -> &CatalogService<C> {
        &self.catalog
    }

    /// Creates a new order.
    ///
    /// Repeated items in the request are merged into one line.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        let ops = merge_create_lines(&cmd.items)?;
        let order_date = ensure_not_future(cmd.order_date.unwrap_or_else(Utc::now))?;

        self.users.ensure_exists(cmd.user_id).await?;
        let prices = self.catalog.prices_for(&ops.keys().copied().collect()).await?;

        let mut order = Order::new(cmd.order_id, cmd.user_id, cmd.status, order_date);
        order.apply_batch(&ops, &prices)?;
        order.assign_line_ids();

        let version = self.orders.insert(&order).await?;
        order.set_version(version);

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            user_id = %order.user_id(),
            total = %order.total(),
            lines = order.item_count(),
            "Order created"
        );

        self.publisher
            .publish(&OrderEvent::order_created(&order))
            .await?;
        Ok(order)
    }

    /// Applies a header patch and a line-item batch to an order.
    ///
    /// The order is written back only if something changed, guarded by its
    /// version. A rejected batch leaves the stored order untouched. A batch
    /// that removes the last line deletes the order under the same version
    /// guard and publishes no event.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(&self, cmd: UpdateOrder) -> Result<UpdatedOrder, DomainError> {
        let start = Instant::now();
        let result = self.apply_update(cmd).await;
        metrics::histogram!("order_update_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            metrics::counter!("order_updates_rejected_total").increment(1);
            tracing::warn!(error = %e, "Order update rejected");
        }
        result
    }

    async fn apply_update(&self, cmd: UpdateOrder) -> Result<UpdatedOrder, DomainError> {
        for change in cmd.batch.changes() {
            ensure_positive(change)?;
        }
        if let Some(order_date) = cmd.order_date {
            ensure_not_future(order_date)?;
        }
        if let Some(user_id) = cmd.user_id {
            self.users.ensure_exists(user_id).await?;
        }

        let mut order = self.get_order(cmd.order_id).await?;
        if let Some(expected) = cmd.expected_version
            && expected != order.version()
        {
            return Err(DomainError::StaleVersion {
                order_id: order.id(),
                expected,
                actual: order.version(),
            });
        }

        let ops = normalize(&cmd.batch);
        metrics::histogram!("order_update_lines").record(ops.len() as f64);

        let prices = if ops.is_empty() {
            HashMap::new()
        } else {
            self.catalog
                .prices_for(&priced_item_ids(order.items(), &ops))
                .await?
        };

        let before = order.clone();
        if let Some(user_id) = cmd.user_id {
            order.set_user_id(user_id);
        }
        if let Some(status) = cmd.status {
            order.set_status(status);
        }
        if let Some(order_date) = cmd.order_date {
            order.set_order_date(order_date);
        }
        let outcome = order.apply_batch(&ops, &prices)?;

        if order == before {
            return Ok(UpdatedOrder {
                order,
                total_changed: false,
                lines: outcome.lines,
                deleted: false,
            });
        }

        if !order.has_items() {
            self.orders
                .delete_if_current(order.id(), before.version())
                .await?;

            metrics::counter!("orders_deleted_total").increment(1);
            tracing::info!(order_id = %order.id(), "Order emptied by update and deleted");
            return Ok(UpdatedOrder {
                order,
                total_changed: outcome.total.is_changed(),
                lines: outcome.lines,
                deleted: true,
            });
        }

        order.assign_line_ids();
        let version = self.orders.update(&order, before.version()).await?;
        order.set_version(version);

        metrics::counter!("orders_updated_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            added = outcome.lines.added,
            updated = outcome.lines.updated,
            removed = outcome.lines.removed,
            total = %order.total(),
            "Order updated"
        );

        self.publisher
            .publish(&OrderEvent::order_updated(&order))
            .await?;

        Ok(UpdatedOrder {
            order,
            total_changed: outcome.total.is_changed(),
            lines: outcome.lines,
            deleted: false,
        })
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    /// Loads every requested order, in request order without repeats.
    ///
    /// Fails listing every missing id if any order is unknown.
    #[tracing::instrument(skip(self))]
    pub async fn get_orders(&self, ids: &[OrderId]) -> Result<Vec<Order>, DomainError> {
        let mut requested = Vec::with_capacity(ids.len());
        for id in ids {
            if !requested.contains(id) {
                requested.push(*id);
            }
        }
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<OrderId, Order> = self
            .orders
            .get_many(&requested)
            .await?
            .into_iter()
            .map(|order| (order.id(), order))
            .collect();

        let missing: Vec<OrderId> = requested
            .iter()
            .copied()
            .filter(|id| !found.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::OrdersNotFound(missing));
        }

        Ok(requested
            .iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }

    /// Loads every order placed by a user.
    #[tracing::instrument(skip(self))]
    pub async fn get_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        self.users.ensure_exists(user_id).await?;
        Ok(self.orders.find_by_user(user_id).await?)
    }

    /// Returns the stored total of an order.
    #[tracing::instrument(skip(self))]
    pub async fn order_total(&self, order_id: OrderId) -> Result<Money, DomainError> {
        Ok(self.get_order(order_id).await?.total())
    }

    /// Returns true if the order exists.
    #[tracing::instrument(skip(self))]
    pub async fn order_exists(&self, order_id: OrderId) -> Result<bool, DomainError> {
        Ok(self.orders.exists(order_id).await?)
    }

    /// Deletes an order with its lines, returning what was stored.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self
            .orders
            .delete(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(%order_id, "Order deleted");
        Ok(order)
    }

    /// Moves an order to `Paid` or `Unpaid` after a payment result.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(&self, cmd: RecordPayment) -> Result<Order, DomainError> {
        let mut order = self.get_order(cmd.order_id).await?;
        let status = OrderStatus::from_payment(cmd.payment_status);
        if order.status() == status {
            return Ok(order);
        }

        let expected = order.version();
        order.set_status(status);
        let version = self.orders.update(&order, expected).await?;
        order.set_version(version);

        tracing::info!(order_id = %order.id(), %status, "Order status updated from payment");
        Ok(order)
    }
}

/// Folds the requested lines of a new order into one `Add` per item,
/// summing repeated items.
fn merge_create_lines(items: &[LineChange]) -> Result<OperationMap, OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }

    let mut quantities: HashMap<ItemId, i64> = HashMap::new();
    for change in items {
        ensure_positive(change)?;
        let quantity = quantities.entry(change.item_id).or_insert(0);
        *quantity = quantity
            .checked_add(change.quantity)
            .ok_or(OrderError::InvalidQuantity {
                item_id: change.item_id,
                quantity: change.quantity,
            })?;
    }

    Ok(quantities
        .into_iter()
        .map(|(item_id, quantity)| (item_id, Operation::Add(quantity)))
        .collect())
}

fn ensure_positive(change: &LineChange) -> Result<(), OrderError> {
    if change.quantity <= 0 {
        return Err(OrderError::InvalidQuantity {
            item_id: change.item_id,
            quantity: change.quantity,
        });
    }
    Ok(())
}

fn ensure_not_future(order_date: DateTime<Utc>) -> Result<DateTime<Utc>, OrderError> {
    if order_date > Utc::now() {
        return Err(OrderError::OrderDateInFuture);
    }
    Ok(order_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> ItemId {
        ItemId::new(value)
    }

    #[test]
    fn test_create_lines_merge_repeated_items() {
        let ops = merge_create_lines(&[
            LineChange::new(id(1), 2),
            LineChange::new(id(2), 1),
            LineChange::new(id(1), 3),
        ])
        .unwrap();

        assert_eq!(
            ops,
            OperationMap::from([(id(1), Operation::Add(5)), (id(2), Operation::Add(1))])
        );
    }

    #[test]
    fn test_create_lines_reject_empty_and_non_positive() {
        assert_eq!(merge_create_lines(&[]), Err(OrderError::NoItems));
        assert_eq!(
            merge_create_lines(&[LineChange::new(id(1), 1), LineChange::new(id(2), -4)]),
            Err(OrderError::InvalidQuantity {
                item_id: id(2),
                quantity: -4,
            })
        );
    }

    #[test]
    fn test_future_order_date_is_rejected() {
        let tomorrow = Utc::now() + chrono::Duration::days(1);
        assert_eq!(
            ensure_not_future(tomorrow),
            Err(OrderError::OrderDateInFuture)
        );
        assert!(ensure_not_future(Utc::now() - chrono::Duration::minutes(1)).is_ok());
    }
}
