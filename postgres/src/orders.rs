//! `PostgreSQL` order repository.
//!
//! Orders live in `orders` with their lines in `order_items`. The stored
//! `total_amount_cents` serves aggregate queries; loaded orders recompute
//! their total from the items.
//!
//! Placing and cancelling also move units in `products`, inside the same
//! transaction as the order write.

use crate::products::stock_rejection;
use crate::{db_error, rows};
use async_trait::async_trait;
use shopfront_core::ids::{OrderId, ProductId, UserId};
use shopfront_core::money::Money;
use shopfront_core::order::{Order, OrderItem, OrderRecord, OrderStatus};
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{
    Cancellation, OrderQuery, OrderRepository, RepositoryError, RepositoryResult,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;

const COLUMNS: &str = "id, user_id, status, shipping_address, billing_address, order_date, \
                       shipped_date, delivered_date, created_at, updated_at";

/// `PostgreSQL` order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the items of `order_rows` and assemble the aggregates, keeping
    /// row order.
    async fn assemble(&self, order_rows: Vec<PgRow>) -> RepositoryResult<Vec<Order>> {
        if order_rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids = order_rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(db_error))
            .collect::<RepositoryResult<Vec<_>>>()?;

        let item_rows = sqlx::query(
            r"
            SELECT order_id, product_id, product_name, unit_price_cents, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: i64 = row.try_get("order_id").map_err(db_error)?;
            items.entry(order_id).or_default().push(item(row)?);
        }

        order_rows
            .iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(db_error)?;
                order(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn fetch_all(&self, mut builder: QueryBuilder<'_, Postgres>) -> RepositoryResult<Vec<Order>> {
        let order_rows = builder.build().fetch_all(&self.pool).await.map_err(db_error)?;
        self.assemble(order_rows).await
    }
}

fn item(row: &PgRow) -> RepositoryResult<OrderItem> {
    let quantity: i32 = row.try_get("quantity").map_err(db_error)?;
    Ok(OrderItem {
        product_id: ProductId::new(row.try_get("product_id").map_err(db_error)?),
        product_name: row.try_get("product_name").map_err(db_error)?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents").map_err(db_error)?),
        quantity: u32::try_from(quantity)
            .map_err(|_| RepositoryError::Corrupt(format!("negative quantity {quantity}")))?,
    })
}

fn order(row: &PgRow, items: Vec<OrderItem>) -> RepositoryResult<Order> {
    let status: String = row.try_get("status").map_err(db_error)?;
    let record = OrderRecord {
        id: OrderId::new(row.try_get("id").map_err(db_error)?),
        user_id: UserId::new(row.try_get("user_id").map_err(db_error)?),
        items,
        status: rows::parse("orders.status", &status)?,
        shipping_address: row.try_get("shipping_address").map_err(db_error)?,
        billing_address: row.try_get("billing_address").map_err(db_error)?,
        order_date: row.try_get("order_date").map_err(db_error)?,
        shipped_date: row.try_get("shipped_date").map_err(db_error)?,
        delivered_date: row.try_get("delivered_date").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    };
    let id = record.id;
    Order::from_record(record).map_err(|e| RepositoryError::Corrupt(format!("order {id}: {e}")))
}

fn quantity(item: &OrderItem) -> RepositoryResult<i32> {
    i32::try_from(item.quantity)
        .map_err(|_| RepositoryError::Internal(format!("quantity {} too large", item.quantity)))
}

/// Upserts the order row and replaces its items.
async fn write_order(conn: &mut PgConnection, order: &Order) -> RepositoryResult<()> {
    sqlx::query(
        r"
        INSERT INTO orders
            (id, user_id, total_amount_cents, status, shipping_address, billing_address,
             order_date, shipped_date, delivered_date, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            total_amount_cents = EXCLUDED.total_amount_cents,
            status = EXCLUDED.status,
            shipping_address = EXCLUDED.shipping_address,
            billing_address = EXCLUDED.billing_address,
            shipped_date = EXCLUDED.shipped_date,
            delivered_date = EXCLUDED.delivered_date,
            updated_at = EXCLUDED.updated_at
        ",
    )
    .bind(order.id().value())
    .bind(order.user_id().value())
    .bind(order.total_amount().cents())
    .bind(order.status().as_str())
    .bind(order.shipping_address())
    .bind(order.billing_address())
    .bind(order.order_date())
    .bind(order.shipped_date())
    .bind(order.delivered_date())
    .bind(order.created_at())
    .bind(order.updated_at())
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(order.id().value())
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    for (line_no, item) in (1_i32..).zip(order.items()) {
        sqlx::query(
            r"
            INSERT INTO order_items
                (order_id, line_no, product_id, product_name, unit_price_cents, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(order.id().value())
        .bind(line_no)
        .bind(item.product_id.value())
        .bind(&item.product_name)
        .bind(item.unit_price.cents())
        .bind(quantity(item)?)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.value());
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(since) = query.created_after {
        builder.push(" AND created_at > ").push_bind(since);
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn next_id(&self) -> RepositoryResult<OrderId> {
        let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('orders', 'id'))")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(OrderId::new(id))
    }

    async fn find_by_id(&self, id: OrderId) -> RepositoryResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(self.assemble(row.into_iter().collect()).await?.pop())
    }

    async fn find_matching(
        &self,
        query: &OrderQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Order>> {
        let total = self.count_matching(query).await?;

        let (limit, offset) = rows::limit_offset(page)?;
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM orders"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        Ok(Page::new(self.fetch_all(select).await?, page, total))
    }

    async fn find_all_matching(&self, query: &OrderQuery) -> RepositoryResult<Vec<Order>> {
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM orders"));
        push_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC, id DESC");
        self.fetch_all(select).await
    }

    async fn count_matching(&self, query: &OrderQuery) -> RepositoryResult<u64> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, query);
        rows::count(&count.build().fetch_one(&self.pool).await.map_err(db_error)?)
    }

    async fn sum_total(&self, query: &OrderQuery) -> RepositoryResult<Money> {
        let mut sum =
            QueryBuilder::new("SELECT COALESCE(SUM(total_amount_cents), 0)::BIGINT FROM orders");
        push_filters(&mut sum, query);
        let row = sum.build().fetch_one(&self.pool).await.map_err(db_error)?;
        Ok(Money::from_cents(row.try_get(0).map_err(db_error)?))
    }

    async fn save(&self, order: &Order) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        write_order(&mut tx, order).await?;
        tx.commit().await.map_err(db_error)?;
        tracing::debug!(order_id = %order.id(), items = order.items().len(), "Saved order");
        Ok(())
    }

    async fn place(&self, order: &Order) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for item in order.items() {
            let quantity = quantity(item)?;
            let taken = sqlx::query(
                r"
                UPDATE products
                SET stock_quantity = stock_quantity - $2, updated_at = $3
                WHERE id = $1 AND stock_quantity >= $2
                ",
            )
            .bind(item.product_id.value())
            .bind(quantity)
            .bind(order.created_at())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            if taken.rows_affected() == 0 {
                return Err(stock_rejection(&mut tx, item.product_id, i64::from(quantity)).await);
            }
        }
        write_order(&mut tx, order).await?;

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(order_id = %order.id(), items = order.items().len(), "Placed order");
        Ok(())
    }

    async fn cancel(&self, order: &Order, expected: OrderStatus) -> RepositoryResult<Cancellation> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let stored: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order.id().value())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
        if let Some(status) = stored {
            let current: OrderStatus = rows::parse("orders.status", &status)?;
            if current != expected {
                return Ok(Cancellation::Stale { current });
            }
        }

        let mut missing_products = Vec::new();
        for item in order.items() {
            let restored = sqlx::query(
                r"
                UPDATE products
                SET stock_quantity = stock_quantity + $2, updated_at = $3
                WHERE id = $1
                ",
            )
            .bind(item.product_id.value())
            .bind(quantity(item)?)
            .bind(order.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            if restored.rows_affected() == 0 {
                missing_products.push(item.product_id);
            }
        }
        write_order(&mut tx, order).await?;

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(order_id = %order.id(), "Cancelled order");
        Ok(Cancellation::Cancelled { missing_products })
    }
}
