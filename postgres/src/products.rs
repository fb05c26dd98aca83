//! `PostgreSQL` product repository.

use crate::{db_error, rows};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_core::ids::ProductId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::{Product, ProductStatus};
use shopfront_core::providers::{ProductQuery, ProductRepository, RepositoryError, RepositoryResult};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

const COLUMNS: &str = "id, name, description, price_cents, stock_quantity, category_id, brand, \
                       sku, status, view_count, created_at, updated_at";

/// `PostgreSQL` product repository.
#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(&self, mut builder: QueryBuilder<'_, Postgres>) -> RepositoryResult<Vec<Product>> {
        builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(rows::product)
            .collect()
    }
}

/// Explains why a guarded stock update matched no row.
pub(crate) async fn stock_rejection(
    conn: &mut PgConnection,
    id: ProductId,
    requested: i64,
) -> RepositoryError {
    let available = sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(id.value())
        .fetch_optional(conn)
        .await;
    match available {
        Ok(Some(available)) => RepositoryError::InsufficientStock {
            product_id: id,
            requested,
            available: i64::from(available),
        },
        Ok(None) => RepositoryError::ProductNotFound(id),
        Err(error) => db_error(error),
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE TRUE");
    if let Some(keyword) = &query.keyword {
        let pattern = rows::like_pattern(keyword);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category_id) = query.category_id {
        builder.push(" AND category_id = ").push_bind(category_id.value());
    }
    if let Some(min) = query.min_price {
        builder.push(" AND price_cents >= ").push_bind(min.cents());
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price_cents <= ").push_bind(max.cents());
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn next_id(&self) -> RepositoryResult<ProductId> {
        let id: i64 =
            sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('products', 'id'))")
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(ProductId::new(id))
    }

    async fn find_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        sqlx::query(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(rows::product)
            .transpose()
    }

    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        sqlx::query(&format!("SELECT {COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(rows::product)
            .transpose()
    }

    async fn find_matching(
        &self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Product>> {
        let total = self.count_matching(query).await?;

        let (limit, offset) = rows::limit_offset(page)?;
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM products"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        Ok(Page::new(self.fetch_all(select).await?, page, total))
    }

    async fn find_low_stock(&self, threshold: i32) -> RepositoryResult<Vec<Product>> {
        let mut select = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM products WHERE stock_quantity <= "
        ));
        select
            .push_bind(threshold)
            .push(" ORDER BY stock_quantity, id");
        self.fetch_all(select).await
    }

    async fn find_popular(&self, limit: u32) -> RepositoryResult<Vec<Product>> {
        let mut select =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM products WHERE status = "));
        select
            .push_bind(ProductStatus::Active.as_str())
            .push(" ORDER BY view_count DESC, id LIMIT ")
            .push_bind(i64::from(limit));
        self.fetch_all(select).await
    }

    async fn count_matching(&self, query: &ProductQuery) -> RepositoryResult<u64> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, query);
        rows::count(&count.build().fetch_one(&self.pool).await.map_err(db_error)?)
    }

    async fn save(&self, product: &Product) -> RepositoryResult<()> {
        sqlx::query(
            r"
            INSERT INTO products
                (id, name, description, price_cents, stock_quantity, category_id, brand,
                 sku, status, view_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price_cents = EXCLUDED.price_cents,
                category_id = EXCLUDED.category_id,
                brand = EXCLUDED.brand,
                sku = EXCLUDED.sku,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(product.id.value())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock_quantity)
        .bind(product.category_id.map(|id| id.value()))
        .bind(&product.brand)
        .bind(&product.sku)
        .bind(product.status.as_str())
        .bind(product.view_count)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = $3 \
             WHERE id = $1 AND stock_quantity + $2 >= 0 RETURNING {COLUMNS}"
        ))
        .bind(id.value())
        .bind(delta)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => rows::product(&row),
            None => {
                let mut conn = self.pool.acquire().await.map_err(db_error)?;
                Err(stock_rejection(&mut conn, id, -i64::from(delta)).await)
            }
        }
    }

    async fn increment_view_count(&self, id: ProductId) -> RepositoryResult<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products SET view_count = view_count + 1 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref()
            .map(rows::product)
            .transpose()?
            .ok_or(RepositoryError::ProductNotFound(id))
    }

    async fn delete(&self, id: ProductId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
