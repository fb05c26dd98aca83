//! `PostgreSQL` user repository.

use crate::{db_error, rows};
use async_trait::async_trait;
use shopfront_core::ids::UserId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{RepositoryResult, UserQuery, UserRepository};
use shopfront_core::user::User;
use sqlx::{PgPool, Postgres, QueryBuilder};

const COLUMNS: &str =
    "id, email, name, password_hash, phone, status, role, created_at, updated_at";

/// `PostgreSQL` user repository.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    builder.push(" WHERE TRUE");
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn next_id(&self) -> RepositoryResult<UserId> {
        let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('users', 'id'))")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(UserId::new(id))
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        sqlx::query(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(rows::user)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        sqlx::query(&format!(
            "SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(rows::user)
        .transpose()
    }

    async fn exists_by_email(&self, email: &str) -> RepositoryResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn find_matching(
        &self,
        query: &UserQuery,
        page: PageRequest,
    ) -> RepositoryResult<Page<User>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count, query);
        let total = rows::count(&count.build().fetch_one(&self.pool).await.map_err(db_error)?)?;

        let (limit, offset) = rows::limit_offset(page)?;
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM users"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let users = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(rows::user)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Page::new(users, page, total))
    }

    async fn save(&self, user: &User) -> RepositoryResult<()> {
        sqlx::query(
            r"
            INSERT INTO users
                (id, email, name, password_hash, phone, status, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                password_hash = EXCLUDED.password_hash,
                phone = EXCLUDED.phone,
                status = EXCLUDED.status,
                role = EXCLUDED.role,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(user.id.value())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.status.as_str())
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
