//! Report rows produced by the batch jobs and the store they are read
//! from and written to.

use crate::error::{BatchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shopfront_core::ids::{OrderId, UserId};
use shopfront_core::money::Money;
use shopfront_core::order::OrderStatus;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{OrderQuery, OrderRepository, UserQuery, UserRepository};
use shopfront_core::user::{Role, UserStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An order joined with its owner's email and item count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSnapshot {
    /// Order id
    pub order_id: OrderId,
    /// Owner
    pub user_id: UserId,
    /// Owner's email
    pub user_email: String,
    /// Status at read time
    pub status: OrderStatus,
    /// Order total
    pub total_amount: Money,
    /// Sum of line quantities
    pub total_items: u64,
    /// When the order was placed
    pub order_date: DateTime<Utc>,
}

/// The user fields the statistics job reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSnapshot {
    /// User id
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
    /// Role
    pub role: Role,
    /// Account status
    pub status: UserStatus,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last profile change
    pub updated_at: DateTime<Utc>,
}

/// One row of the daily order report, unique per order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderReport {
    /// Reported order
    pub order_id: OrderId,
    /// Owner
    pub user_id: UserId,
    /// Owner's email
    pub user_email: String,
    /// Status when reported
    pub order_status: OrderStatus,
    /// Order total
    pub total_amount: Money,
    /// Sum of line quantities
    pub total_items: u64,
    /// When the order was placed
    pub order_date: DateTime<Utc>,
    /// When the report row was produced
    pub report_date: DateTime<Utc>,
    /// Reporting period, e.g. `DAILY`
    pub report_period: String,
}

/// One user's statistics for a day, unique per user and date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserStatistics {
    /// User id
    pub user_id: UserId,
    /// Display name
    pub user_name: String,
    /// Email
    pub user_email: String,
    /// Role
    pub user_role: Role,
    /// Registration time
    pub registration_date: DateTime<Utc>,
    /// Last observed activity
    pub last_active_date: Option<DateTime<Utc>>,
    /// Whether the account is active
    pub is_active: bool,
    /// Day the statistics describe
    pub statistics_date: NaiveDate,
}

/// Source and sink for the report jobs.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Orders created strictly after `since`, with owner email and item
    /// count.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    async fn orders_created_since(
        &self,
        since: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<Page<OrderSnapshot>>;

    /// Insert or replace reports keyed by order id.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written.
    async fn upsert_order_reports(&self, reports: &[OrderReport]) -> Result<()>;

    /// Users with `ACTIVE` status, by id.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    async fn active_users(&self, page: PageRequest) -> Result<Page<UserSnapshot>>;

    /// Insert or replace statistics keyed by user and date.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written.
    async fn upsert_user_statistics(&self, statistics: &[UserStatistics]) -> Result<()>;
}

fn limit_offset(page: PageRequest) -> Result<(i64, i64)> {
    let offset = i64::try_from(page.offset())
        .map_err(|_| BatchError::Store(format!("offset {} out of range", page.offset())))?;
    Ok((i64::from(page.size()), offset))
}

fn count(row: &PgRow) -> Result<u64> {
    let total: i64 = row.try_get(0)?;
    Ok(u64::try_from(total).unwrap_or_default())
}

fn parse<T: std::str::FromStr<Err = shopfront_core::DomainError>>(raw: &str) -> Result<T> {
    raw.parse().map_err(|e| BatchError::Store(format!("unreadable value '{raw}': {e}")))
}

/// `PostgreSQL` report store over the shared schema.
#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn order_snapshot(row: &PgRow) -> Result<OrderSnapshot> {
    let status: String = row.try_get("status")?;
    let total_items: i64 = row.try_get("total_items")?;
    Ok(OrderSnapshot {
        order_id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        user_email: row.try_get("email")?,
        status: parse(&status)?,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        total_items: u64::try_from(total_items).unwrap_or_default(),
        order_date: row.try_get("order_date")?,
    })
}

fn user_snapshot(row: &PgRow) -> Result<UserSnapshot> {
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("status")?;
    Ok(UserSnapshot {
        user_id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: parse(&role)?,
        status: parse(&status)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn orders_created_since(
        &self,
        since: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<Page<OrderSnapshot>> {
        let total = count(
            &sqlx::query("SELECT COUNT(*) FROM orders WHERE created_at > $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?,
        )?;

        let (limit, offset) = limit_offset(page)?;
        let rows = sqlx::query(
            r"
            SELECT o.id, o.user_id, u.email, o.status, o.total_amount_cents, o.order_date,
                   COALESCE(SUM(oi.quantity), 0)::BIGINT AS total_items
            FROM orders o
            JOIN users u ON u.id = o.user_id
            LEFT JOIN order_items oi ON oi.order_id = o.id
            WHERE o.created_at > $1
            GROUP BY o.id, u.email
            ORDER BY o.id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(since)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(order_snapshot).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }

    async fn upsert_order_reports(&self, reports: &[OrderReport]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for report in reports {
            let total_items = i64::try_from(report.total_items)
                .map_err(|_| BatchError::Store(format!("item count {} too large", report.total_items)))?;
            sqlx::query(
                r"
                INSERT INTO order_reports
                    (order_id, user_id, user_email, order_status, total_amount_cents,
                     total_items, order_date, report_date, report_period)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (order_id) DO UPDATE SET
                    user_email = EXCLUDED.user_email,
                    order_status = EXCLUDED.order_status,
                    total_amount_cents = EXCLUDED.total_amount_cents,
                    total_items = EXCLUDED.total_items,
                    report_date = EXCLUDED.report_date,
                    report_period = EXCLUDED.report_period
                ",
            )
            .bind(report.order_id.value())
            .bind(report.user_id.value())
            .bind(&report.user_email)
            .bind(report.order_status.as_str())
            .bind(report.total_amount.cents())
            .bind(total_items)
            .bind(report.order_date)
            .bind(report.report_date)
            .bind(&report.report_period)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn active_users(&self, page: PageRequest) -> Result<Page<UserSnapshot>> {
        let total = count(
            &sqlx::query("SELECT COUNT(*) FROM users WHERE status = $1")
                .bind(UserStatus::Active.as_str())
                .fetch_one(&self.pool)
                .await?,
        )?;

        let (limit, offset) = limit_offset(page)?;
        let rows = sqlx::query(
            r"
            SELECT id, name, email, role, status, created_at, updated_at
            FROM users
            WHERE status = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(UserStatus::Active.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(user_snapshot).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }

    async fn upsert_user_statistics(&self, statistics: &[UserStatistics]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for stats in statistics {
            sqlx::query(
                r"
                INSERT INTO user_statistics
                    (user_id, user_name, user_email, user_role, registration_date,
                     last_active_date, is_active, statistics_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (user_id, statistics_date) DO UPDATE SET
                    user_name = EXCLUDED.user_name,
                    user_email = EXCLUDED.user_email,
                    user_role = EXCLUDED.user_role,
                    last_active_date = EXCLUDED.last_active_date,
                    is_active = EXCLUDED.is_active
                ",
            )
            .bind(stats.user_id.value())
            .bind(&stats.user_name)
            .bind(&stats.user_email)
            .bind(stats.user_role.as_str())
            .bind(stats.registration_date)
            .bind(stats.last_active_date)
            .bind(stats.is_active)
            .bind(stats.statistics_date)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Report store reading through the repository traits and keeping output
/// in memory.
#[derive(Clone)]
pub struct InMemoryReportStore {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    order_reports: Arc<Mutex<BTreeMap<OrderId, OrderReport>>>,
    user_statistics: Arc<Mutex<BTreeMap<(UserId, NaiveDate), UserStatistics>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryReportStore {
    /// Create a store over the given repositories.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            orders,
            users,
            order_reports: Arc::default(),
            user_statistics: Arc::default(),
        }
    }

    /// Stored order reports, by order id.
    #[must_use]
    pub fn order_reports(&self) -> Vec<OrderReport> {
        lock(&self.order_reports).values().cloned().collect()
    }

    /// Stored user statistics, by user then date.
    #[must_use]
    pub fn user_statistics(&self) -> Vec<UserStatistics> {
        lock(&self.user_statistics).values().cloned().collect()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn orders_created_since(
        &self,
        since: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<Page<OrderSnapshot>> {
        let query = OrderQuery {
            created_after: Some(since),
            ..OrderQuery::default()
        };
        let mut all = self.orders.find_all_matching(&query).await?;
        all.sort_by_key(shopfront_core::order::Order::id);
        let orders = Page::paginate(all, page);

        let mut items = Vec::with_capacity(orders.items.len());
        for order in &orders.items {
            // Orders whose owner is gone drop out, as they would from the join.
            let Some(user) = self.users.find_by_id(order.user_id()).await? else {
                continue;
            };
            items.push(OrderSnapshot {
                order_id: order.id(),
                user_id: order.user_id(),
                user_email: user.email,
                status: order.status(),
                total_amount: order.total_amount(),
                total_items: order.total_units(),
                order_date: order.order_date(),
            });
        }
        Ok(Page::new(items, page, orders.total_elements))
    }

    async fn upsert_order_reports(&self, reports: &[OrderReport]) -> Result<()> {
        let mut stored = lock(&self.order_reports);
        for report in reports {
            stored.insert(report.order_id, report.clone());
        }
        Ok(())
    }

    async fn active_users(&self, page: PageRequest) -> Result<Page<UserSnapshot>> {
        let query = UserQuery {
            status: Some(UserStatus::Active),
            ..UserQuery::default()
        };
        let users = self.users.find_matching(&query, page).await?;
        Ok(users.map(|user| UserSnapshot {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }))
    }

    async fn upsert_user_statistics(&self, statistics: &[UserStatistics]) -> Result<()> {
        let mut stored = lock(&self.user_statistics);
        for stats in statistics {
            stored.insert((stats.user_id, stats.statistics_date), stats.clone());
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReportStore")
            .field("order_reports", &lock(&self.order_reports).len())
            .field("user_statistics", &lock(&self.user_statistics).len())
            .finish_non_exhaustive()
    }
}
