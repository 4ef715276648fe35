use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, LineId, OrderId, UserId, Version};
use domain::{
    CatalogItem, CatalogStore, LineItem, Money, NewCatalogItem, Order, OrderStatus, OrderStore,
    StoreError, StoreResult,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, status, order_date, total, version";

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::backend(e)
}

/// PostgreSQL-backed order store.
///
/// An order row and its line items are written in one transaction; the
/// `version` column guards every update.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_order(row: &PgRow, items: Vec<LineItem>) -> StoreResult<Order> {
        let status: String = row.try_get("status").map_err(backend)?;
        let status: OrderStatus = status.parse().map_err(StoreError::backend)?;
        let order_date: DateTime<Utc> = row.try_get("order_date").map_err(backend)?;
        let total: Decimal = row.try_get("total").map_err(backend)?;

        Ok(Order::restore(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(backend)?),
            status,
            order_date,
            Money::new(total),
            items,
            Version::new(row.try_get("version").map_err(backend)?),
        ))
    }

    /// Loads the line items of the given orders and assembles the aggregates.
    async fn attach_lines(conn: &mut PgConnection, rows: Vec<PgRow>) -> StoreResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;

        let line_rows = sqlx::query(
            r#"
            SELECT id, order_id, item_id, quantity
            FROM order_line_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(backend)?;

        let mut lines: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for row in line_rows {
            let order_id: Uuid = row.try_get("order_id").map_err(backend)?;
            let line = LineItem::with_line_id(
                LineId::from_uuid(row.try_get("id").map_err(backend)?),
                ItemId::new(row.try_get("item_id").map_err(backend)?),
                row.try_get("quantity").map_err(backend)?,
            );
            lines.entry(order_id).or_default().push(line);
        }

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn write_lines(conn: &mut PgConnection, order: &Order) -> StoreResult<()> {
        for (position, line) in order.items().iter().enumerate() {
            let position = i32::try_from(position).map_err(StoreError::backend)?;
            let line_id = line.line_id.unwrap_or_default();
            sqlx::query(
                r#"
                INSERT INTO order_line_items (id, order_id, item_id, quantity, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(line_id.as_uuid())
            .bind(order.id().as_uuid())
            .bind(line.item_id.as_i64())
            .bind(line.quantity)
            .bind(position)
            .execute(&mut *conn)
            .await
            .map_err(backend)?;
        }
        Ok(())
    }

    async fn current_version(conn: &mut PgConnection, order_id: OrderId) -> StoreResult<Version> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend)?;
        Ok(version.map(Version::new).unwrap_or(Version::initial()))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn insert(&self, order: &Order) -> StoreResult<Version> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, order_date, total, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.order_date())
        .bind(order.total().amount())
        .bind(Version::first().as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrder(order.id());
            }
            backend(e)
        })?;

        Self::write_lines(&mut tx, order).await?;

        tx.commit().await.map_err(backend)?;
        Ok(Version::first())
    }

    async fn get(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.get_many(&[order_id]).await?.into_iter().next())
    }

    async fn get_many(&self, ids: &[OrderId]) -> StoreResult<Vec<Order>> {
        let ids: Vec<Uuid> = ids.iter().map(OrderId::as_uuid).collect();
        let mut conn = self.pool.acquire().await.map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(backend)?;

        Self::attach_lines(&mut conn, rows).await
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date, id"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&mut *conn)
        .await
        .map_err(backend)?;

        Self::attach_lines(&mut conn, rows).await
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn update(&self, order: &Order, expected: Version) -> StoreResult<Version> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET user_id = $2, status = $3, order_date = $4, total = $5, version = version + 1
            WHERE id = $1 AND version = $6
            RETURNING version
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.order_date())
        .bind(order.total().amount())
        .bind(expected.as_i64())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(version) = version else {
            let actual = Self::current_version(&mut tx, order.id()).await?;
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected,
                actual,
            });
        };

        sqlx::query("DELETE FROM order_line_items WHERE order_id = $1")
            .bind(order.id().as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        Self::write_lines(&mut tx, order).await?;

        tx.commit().await.map_err(backend)?;
        Ok(Version::new(version))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;
        let Some(order) = Self::attach_lines(&mut tx, rows).await?.into_iter().next() else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(Some(order))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_if_current(&self, order_id: OrderId, expected: Version) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1 AND version = $2")
            .bind(order_id.as_uuid())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        if deleted.rows_affected() == 0 {
            let actual = Self::current_version(&mut tx, order_id).await?;
            return Err(StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            });
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn exists(&self, order_id: OrderId) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(order_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }
}

/// PostgreSQL-backed catalog store.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_item(row: &PgRow) -> StoreResult<CatalogItem> {
        let price: Decimal = row.try_get("price").map_err(backend)?;
        Ok(CatalogItem {
            id: ItemId::new(row.try_get("id").map_err(backend)?),
            name: row.try_get("name").map_err(backend)?,
            price: Money::new(price),
        })
    }

    fn name_clash(e: sqlx::Error, name: &str) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::DuplicateItemName(name.to_string());
        }
        backend(e)
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn insert(&self, item: NewCatalogItem) -> StoreResult<CatalogItem> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO catalog_items (name, price) VALUES ($1, $2) RETURNING id")
                .bind(&item.name)
                .bind(item.price.amount())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Self::name_clash(e, &item.name))?;

        Ok(CatalogItem {
            id: ItemId::new(id),
            name: item.name,
            price: item.price,
        })
    }

    async fn get(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
        let row = sqlx::query("SELECT id, name, price FROM catalog_items WHERE id = $1")
            .bind(item_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn get_many(&self, ids: &[ItemId]) -> StoreResult<Vec<CatalogItem>> {
        let ids: Vec<i64> = ids.iter().map(ItemId::as_i64).collect();
        let rows = sqlx::query("SELECT id, name, price FROM catalog_items WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn update(&self, item: &CatalogItem) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE catalog_items SET name = $2, price = $3 WHERE id = $1")
            .bind(item.id.as_i64())
            .bind(&item.name)
            .bind(item.price.amount())
            .execute(&self.pool)
            .await
            .map_err(|e| Self::name_clash(e, &item.name))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, item_id: ItemId) -> StoreResult<Option<CatalogItem>> {
        let row = sqlx::query("DELETE FROM catalog_items WHERE id = $1 RETURNING id, name, price")
            .bind(item_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return StoreError::ItemInUse(item_id);
                }
                backend(e)
            })?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn exists_by_name(&self, name: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM catalog_items WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }
}
