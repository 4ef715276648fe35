use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::{ItemId, OrderId, UserId, Version};
use domain::{CatalogItem, CatalogStore, NewCatalogItem, Order, OrderStore, StoreError, StoreResult};
use tokio::sync::RwLock;

/// In-memory order store.
///
/// Provides the same versioning behavior as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Removes every order.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> StoreResult<Version> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateOrder(order.id()));
        }

        let mut stored = order.clone();
        stored.set_version(Version::first());
        orders.insert(order.id(), stored);
        Ok(Version::first())
    }

    async fn get(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn get_many(&self, ids: &[OrderId]) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(ids.iter().filter_map(|id| orders.get(id)).cloned().collect())
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut found: Vec<Order> = orders
            .values()
            .filter(|order| order.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|order| (order.order_date(), order.id()));
        Ok(found)
    }

    async fn update(&self, order: &Order, expected: Version) -> StoreResult<Version> {
        let mut orders = self.orders.write().await;

        let actual = orders
            .get(&order.id())
            .map(Order::version)
            .unwrap_or(Version::initial());
        if actual != expected || actual == Version::initial() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected,
                actual,
            });
        }

        let version = actual.next();
        let mut stored = order.clone();
        stored.set_version(version);
        orders.insert(order.id(), stored);
        Ok(version)
    }

    async fn delete(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.orders.write().await.remove(&order_id))
    }

    async fn delete_if_current(&self, order_id: OrderId, expected: Version) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        match orders.get(&order_id).map(Order::version) {
            Some(actual) if actual == expected => {
                orders.remove(&order_id);
                Ok(())
            }
            actual => Err(StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual: actual.unwrap_or(Version::initial()),
            }),
        }
    }

    async fn exists(&self, order_id: OrderId) -> StoreResult<bool> {
        Ok(self.orders.read().await.contains_key(&order_id))
    }
}

#[derive(Default)]
struct CatalogState {
    items: BTreeMap<ItemId, CatalogItem>,
    last_id: i64,
}

impl CatalogState {
    fn name_taken(&self, name: &str, except: Option<ItemId>) -> bool {
        self.items
            .values()
            .any(|item| item.name == name && Some(item.id) != except)
    }
}

/// In-memory catalog store. Ids are assigned sequentially from 1.
///
/// When linked to an order store, deleting an item that an order line
/// still uses fails with `ItemInUse`, like the PostgreSQL foreign key.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<CatalogState>>,
    orders: Option<Arc<RwLock<HashMap<OrderId, Order>>>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty in-memory catalog store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty catalog whose deletes check the lines of `orders`.
    pub fn referenced_by(orders: &InMemoryOrderStore) -> Self {
        Self {
            state: Arc::default(),
            orders: Some(orders.orders.clone()),
        }
    }

    /// Returns the number of stored items.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert(&self, item: NewCatalogItem) -> StoreResult<CatalogItem> {
        let mut state = self.state.write().await;
        if state.name_taken(&item.name, None) {
            return Err(StoreError::DuplicateItemName(item.name));
        }

        state.last_id += 1;
        let stored = CatalogItem {
            id: ItemId::new(state.last_id),
            name: item.name,
            price: item.price,
        };
        state.items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
        Ok(self.state.read().await.items.get(&item_id).cloned())
    }

    async fn get_many(&self, ids: &[ItemId]) -> StoreResult<Vec<CatalogItem>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.items.get(id))
            .cloned()
            .collect())
    }

    async fn update(&self, item: &CatalogItem) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.items.contains_key(&item.id) {
            return Ok(false);
        }
        if state.name_taken(&item.name, Some(item.id)) {
            return Err(StoreError::DuplicateItemName(item.name.clone()));
        }

        state.items.insert(item.id, item.clone());
        Ok(true)
    }

    async fn delete(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
        let mut state = self.state.write().await;
        if let Some(orders) = &self.orders
            && orders
                .read()
                .await
                .values()
                .any(|order| order.get_item(item_id).is_some())
        {
            return Err(StoreError::ItemInUse(item_id));
        }
        Ok(state.items.remove(&item_id))
    }

    async fn exists_by_name(&self, name: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.name_taken(name, None))
    }
}
