//! Persistence ports for orders and catalog items.
//!
//! The domain only talks to storage through these traits; the `store`
//! crate provides in-memory and PostgreSQL implementations.

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ItemId, OrderId, UserId, Version};
use thiserror::Error;

use crate::catalog::{CatalogItem, NewCatalogItem};
use crate::order::Order;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored order moved on since it was read.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// An order with this id is already stored.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// Another catalog item already uses this name.
    #[error("Item name already taken: {0}")]
    DuplicateItemName(String),

    /// The catalog item is still referenced by order lines.
    #[error("Item {0} is referenced by existing orders")]
    ItemInUse(ItemId),

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend-specific error.
    pub fn backend(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        StoreError::Backend(err.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for order aggregates and their line items.
///
/// Implementations persist an order and its lines as one unit and
/// guard updates with the order's version counter.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order at [`Version::first`].
    ///
    /// Fails with `DuplicateOrder` if the id is taken.
    async fn insert(&self, order: &Order) -> StoreResult<Version>;

    /// Loads an order with its line items.
    async fn get(&self, order_id: OrderId) -> StoreResult<Option<Order>>;

    /// Loads every order in `ids` that exists, in no particular order.
    async fn get_many(&self, ids: &[OrderId]) -> StoreResult<Vec<Order>>;

    /// Loads every order placed by a user.
    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

    /// Replaces a stored order if it is still at `expected`.
    ///
    /// Returns the new version. Fails with `ConcurrencyConflict` when the
    /// stored version differs or the order is gone.
    async fn update(&self, order: &Order, expected: Version) -> StoreResult<Version>;

    /// Deletes an order with its lines, returning what was stored.
    async fn delete(&self, order_id: OrderId) -> StoreResult<Option<Order>>;

    /// Deletes an order with its lines if it is still at `expected`.
    ///
    /// Fails with `ConcurrencyConflict` when the stored version differs or
    /// the order is gone.
    async fn delete_if_current(&self, order_id: OrderId, expected: Version) -> StoreResult<()>;

    /// Returns true if the order exists.
    async fn exists(&self, order_id: OrderId) -> StoreResult<bool>;
}

/// Storage for catalog items.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Stores a new item and assigns its id.
    async fn insert(&self, item: NewCatalogItem) -> StoreResult<CatalogItem>;

    /// Loads one item.
    async fn get(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>>;

    /// Loads every item in `ids` that exists, in no particular order.
    async fn get_many(&self, ids: &[ItemId]) -> StoreResult<Vec<CatalogItem>>;

    /// Overwrites name and price. Returns false if the item does not exist.
    async fn update(&self, item: &CatalogItem) -> StoreResult<bool>;

    /// Deletes an item, returning what was stored.
    async fn delete(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>>;

    /// Returns true if any item uses exactly this name.
    async fn exists_by_name(&self, name: &str) -> StoreResult<bool>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn insert(&self, order: &Order) -> StoreResult<Version> {
        (**self).insert(order).await
    }

    async fn get(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        (**self).get(order_id).await
    }

    async fn get_many(&self, ids: &[OrderId]) -> StoreResult<Vec<Order>> {
        (**self).get_many(ids).await
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        (**self).find_by_user(user_id).await
    }

    async fn update(&self, order: &Order, expected: Version) -> StoreResult<Version> {
        (**self).update(order, expected).await
    }

    async fn delete(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        (**self).delete(order_id).await
    }

    async fn delete_if_current(&self, order_id: OrderId, expected: Version) -> StoreResult<()> {
        (**self).delete_if_current(order_id, expected).await
    }

    async fn exists(&self, order_id: OrderId) -> StoreResult<bool> {
        (**self).exists(order_id).await
    }
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn insert(&self, item: NewCatalogItem) -> StoreResult<CatalogItem> {
        (**self).insert(item).await
    }

    async fn get(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
        (**self).get(item_id).await
    }

    async fn get_many(&self, ids: &[ItemId]) -> StoreResult<Vec<CatalogItem>> {
        (**self).get_many(ids).await
    }

    async fn update(&self, item: &CatalogItem) -> StoreResult<bool> {
        (**self).update(item).await
    }

    async fn delete(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
        (**self).delete(item_id).await
    }

    async fn exists_by_name(&self, name: &str) -> StoreResult<bool> {
        (**self).exists_by_name(name).await
    }
}
