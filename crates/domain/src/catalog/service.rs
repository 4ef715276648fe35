//! Catalog service: item CRUD plus the existence and price lookups the
//! order service relies on.

use std::collections::{BTreeSet, HashMap};

use common::ItemId;

use super::{CatalogError, CatalogItem, NewCatalogItem, validate_name, validate_price};
use crate::error::DomainError;
use crate::order::Money;
use crate::store::CatalogStore;

/// Service for managing catalog items.
pub struct CatalogService<C: CatalogStore> {
    store: C,
}

impl<C: CatalogStore> CatalogService<C> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: C) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &C {
        &self.store
    }

    /// Creates an item with a unique, trimmed name.
    #[tracing::instrument(skip(self))]
    pub async fn create_item(&self, name: &str, price: Money) -> Result<CatalogItem, DomainError> {
        let new_item = NewCatalogItem::new(name, price)?;
        if self.store.exists_by_name(&new_item.name).await? {
            return Err(CatalogError::DuplicateName(new_item.name).into());
        }

        let item = self.store.insert(new_item).await?;
        tracing::info!(item_id = %item.id, name = %item.name, "Catalog item created");
        Ok(item)
    }

    /// Loads one item.
    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, item_id: ItemId) -> Result<CatalogItem, DomainError> {
        self.store
            .get(item_id)
            .await?
            .ok_or(DomainError::ItemNotFound(item_id))
    }

    /// Loads every requested item, in request order without repeats.
    ///
    /// Fails listing every missing id if any is unknown.
    #[tracing::instrument(skip(self))]
    pub async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, DomainError> {
        let requested = distinct(ids);
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<ItemId, CatalogItem> = self
            .store
            .get_many(&requested)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let missing: Vec<ItemId> = requested
            .iter()
            .copied()
            .filter(|id| !found.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::ItemsNotFound(missing));
        }

        Ok(requested
            .iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }

    /// Replaces an item's name and price.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        item_id: ItemId,
        name: &str,
        price: Money,
    ) -> Result<CatalogItem, DomainError> {
        let name = validate_name(name)?;
        let price = validate_price(price)?;

        let current = self.get_item(item_id).await?;
        if current.name != name && self.store.exists_by_name(&name).await? {
            return Err(CatalogError::DuplicateName(name).into());
        }

        let updated = CatalogItem {
            id: item_id,
            name,
            price,
        };
        if !self.store.update(&updated).await? {
            return Err(DomainError::ItemNotFound(item_id));
        }

        tracing::info!(%item_id, "Catalog item updated");
        Ok(updated)
    }

    /// Deletes an item, returning what was stored.
    #[tracing::instrument(skip(self))]
    pub async fn delete_item(&self, item_id: ItemId) -> Result<CatalogItem, DomainError> {
        let item = self
            .store
            .delete(item_id)
            .await?
            .ok_or(DomainError::ItemNotFound(item_id))?;

        tracing::info!(%item_id, "Catalog item deleted");
        Ok(item)
    }

    /// Fails with every unknown id if any referenced item does not exist.
    pub async fn ensure_items_exist(
        &self,
        ids: impl IntoIterator<Item = ItemId>,
    ) -> Result<(), DomainError> {
        let ids: BTreeSet<ItemId> = ids.into_iter().collect();
        self.prices_for(&ids).await.map(|_| ())
    }

    /// Current price of every item in `ids`.
    ///
    /// Fails with every unknown id if any item does not exist.
    pub async fn prices_for(
        &self,
        ids: &BTreeSet<ItemId>,
    ) -> Result<HashMap<ItemId, Money>, DomainError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let requested: Vec<ItemId> = ids.iter().copied().collect();
        let prices: HashMap<ItemId, Money> = self
            .store
            .get_many(&requested)
            .await?
            .into_iter()
            .map(|item| (item.id, item.price))
            .collect();

        let missing: Vec<ItemId> = requested
            .into_iter()
            .filter(|id| !prices.contains_key(id))
            .collect();
        if !missing.is_empty() {
            tracing::debug!(?missing, "Referenced items do not exist");
            return Err(DomainError::ItemsNotFound(missing));
        }

        Ok(prices)
    }
}

fn distinct(ids: &[ItemId]) -> Vec<ItemId> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::store::StoreResult;

    /// Minimal store so the service can be tested without the store crate.
    #[derive(Default)]
    struct VecStore {
        items: Mutex<Vec<CatalogItem>>,
    }

    #[async_trait]
    impl CatalogStore for VecStore {
        async fn insert(&self, item: NewCatalogItem) -> StoreResult<CatalogItem> {
            let mut items = self.items.lock().unwrap();
            let stored = CatalogItem {
                id: ItemId::new(items.len() as i64 + 1),
                name: item.name,
                price: item.price,
            };
            items.push(stored.clone());
            Ok(stored)
        }

        async fn get(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
            let items = self.items.lock().unwrap();
            Ok(items.iter().find(|item| item.id == item_id).cloned())
        }

        async fn get_many(&self, ids: &[ItemId]) -> StoreResult<Vec<CatalogItem>> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|item| ids.contains(&item.id))
                .cloned()
                .collect())
        }

        async fn update(&self, item: &CatalogItem) -> StoreResult<bool> {
            let mut items = self.items.lock().unwrap();
            match items.iter_mut().find(|stored| stored.id == item.id) {
                Some(stored) => {
                    *stored = item.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
            let mut items = self.items.lock().unwrap();
            let index = items.iter().position(|item| item.id == item_id);
            Ok(index.map(|index| items.remove(index)))
        }

        async fn exists_by_name(&self, name: &str) -> StoreResult<bool> {
            let items = self.items.lock().unwrap();
            Ok(items.iter().any(|item| item.name == name))
        }
    }

    fn service() -> CatalogService<VecStore> {
        CatalogService::new(VecStore::default())
    }

    #[tokio::test]
    async fn test_create_and_get_item() {
        let service = service();
        let item = service
            .create_item("  Widget ", Money::from_cents(1000))
            .await
            .unwrap();

        assert_eq!(item.name, "Widget");
        assert_eq!(service.get_item(item.id).await.unwrap(), item);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let service = service();
        service
            .create_item("Widget", Money::from_cents(1000))
            .await
            .unwrap();

        let err = service
            .create_item("Widget ", Money::from_cents(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Catalog(CatalogError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_update_may_keep_own_name() {
        let service = service();
        let item = service
            .create_item("Widget", Money::from_cents(1000))
            .await
            .unwrap();
        service
            .create_item("Gadget", Money::from_cents(500))
            .await
            .unwrap();

        let updated = service
            .update_item(item.id, "Widget", Money::from_cents(1200))
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_cents(1200));

        let err = service
            .update_item(item.id, "Gadget", Money::from_cents(1200))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Catalog(CatalogError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_get_items_reports_every_missing_id() {
        let service = service();
        let item = service
            .create_item("Widget", Money::from_cents(1000))
            .await
            .unwrap();

        let err = service
            .get_items(&[item.id, ItemId::new(40), ItemId::new(41)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ItemsNotFound(ref ids) if ids == &[ItemId::new(40), ItemId::new(41)]
        ));
    }

    #[tokio::test]
    async fn test_get_items_keeps_request_order_without_repeats() {
        let service = service();
        let a = service.create_item("Alpha", Money::from_cents(100)).await.unwrap();
        let b = service.create_item("Beta", Money::from_cents(200)).await.unwrap();

        let items = service.get_items(&[b.id, a.id, b.id]).await.unwrap();
        assert_eq!(items, vec![b, a]);
        assert!(service.get_items(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prices_for_known_items() {
        let service = service();
        let a = service.create_item("Alpha", Money::from_cents(100)).await.unwrap();

        let prices = service.prices_for(&BTreeSet::from([a.id])).await.unwrap();
        assert_eq!(prices.get(&a.id), Some(&Money::from_cents(100)));

        assert!(service.ensure_items_exist([a.id]).await.is_ok());
        assert!(
            service
                .ensure_items_exist([a.id, ItemId::new(99)])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_delete_returns_item_once() {
        let service = service();
        let item = service.create_item("Alpha", Money::from_cents(100)).await.unwrap();

        assert_eq!(service.delete_item(item.id).await.unwrap(), item);
        assert!(matches!(
            service.delete_item(item.id).await,
            Err(DomainError::ItemNotFound(_))
        ));
    }
}
