//! `PostgreSQL` category repository.

use crate::{db_error, rows};
use async_trait::async_trait;
use shopfront_core::category::Category;
use shopfront_core::ids::CategoryId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{CategoryQuery, CategoryRepository, ParentFilter, RepositoryResult};
use sqlx::{PgPool, Postgres, QueryBuilder};

const COLUMNS: &str = "id, name, description, parent_id, status, created_at, updated_at";

/// `PostgreSQL` category repository.
#[derive(Clone)]
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> RepositoryResult<Vec<Category>> {
        builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(rows::category)
            .collect()
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CategoryQuery) {
    builder.push(" WHERE TRUE");
    match query.parent {
        ParentFilter::Any => {}
        ParentFilter::Root => {
            builder.push(" AND parent_id IS NULL");
        }
        ParentFilter::Of(parent) => {
            builder.push(" AND parent_id = ").push_bind(parent.value());
        }
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = &query.keyword {
        builder
            .push(" AND name ILIKE ")
            .push_bind(rows::like_pattern(keyword));
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn next_id(&self) -> RepositoryResult<CategoryId> {
        let id: i64 =
            sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('categories', 'id'))")
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(CategoryId::new(id))
    }

    async fn find_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>> {
        sqlx::query(&format!("SELECT {COLUMNS} FROM categories WHERE id = $1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(rows::category)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Category>> {
        sqlx::query(&format!(
            "SELECT {COLUMNS} FROM categories WHERE LOWER(name) = LOWER($1)"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(rows::category)
        .transpose()
    }

    async fn find_matching(
        &self,
        query: &CategoryQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<Category>> {
        let total = self.count_matching(query).await?;

        let (limit, offset) = rows::limit_offset(page)?;
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM categories"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        Ok(Page::new(self.fetch_all(select).await?, page, total))
    }

    async fn find_all_matching(&self, query: &CategoryQuery) -> RepositoryResult<Vec<Category>> {
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM categories"));
        push_filters(&mut select, query);
        select.push(" ORDER BY name, id");
        self.fetch_all(select).await
    }

    async fn count_matching(&self, query: &CategoryQuery) -> RepositoryResult<u64> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM categories");
        push_filters(&mut count, query);
        rows::count(&count.build().fetch_one(&self.pool).await.map_err(db_error)?)
    }

    async fn save(&self, category: &Category) -> RepositoryResult<()> {
        sqlx::query(
            r"
            INSERT INTO categories
                (id, name, description, parent_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                parent_id = EXCLUDED.parent_id,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(category.id.value())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id.map(|id| id.value()))
        .bind(category.status.as_str())
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn delete(&self, id: CategoryId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
