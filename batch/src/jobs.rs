//! The report jobs: daily order reports and per-user statistics.

use crate::error::Result;
use crate::job::{Job, JobParameters};
use crate::report::{OrderReport, OrderSnapshot, ReportStore, UserSnapshot, UserStatistics};
use crate::step::{ChunkStep, ItemProcessor, ItemReader, ItemWriter, StepExecution};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use shopfront_core::environment::Clock;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::user::UserStatus;
use std::collections::VecDeque;
use std::sync::Arc;

/// Registry name of [`OrderReportJob`].
pub const ORDER_REPORT_JOB: &str = "orderReportJob";
/// Registry name of [`UserStatisticsJob`].
pub const USER_STATISTICS_JOB: &str = "userStatisticsJob";

const ORDER_REPORT_CHUNK: usize = 50;
const USER_STATISTICS_CHUNK: usize = 100;
const DAILY: &str = "DAILY";

/// Buffers one page at a time for a paged reader.
struct PageCursor<T> {
    next_page: u32,
    size: u32,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<T> PageCursor<T> {
    fn new(size: usize) -> Self {
        Self {
            next_page: 0,
            size: u32::try_from(size).unwrap_or(u32::MAX),
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Request for the next page, or `None` once the input is used up.
    fn next_request(&self) -> Option<PageRequest> {
        (self.buffer.is_empty() && !self.exhausted)
            .then(|| PageRequest::new(self.next_page, self.size))
    }

    fn fill(&mut self, page: Page<T>) {
        self.next_page += 1;
        let fetched = u64::from(self.next_page) * u64::from(page.size);
        self.exhausted = page.items.is_empty() || fetched >= page.total_elements;
        self.buffer.extend(page.items);
    }
}

struct RecentOrderReader {
    store: Arc<dyn ReportStore>,
    since: DateTime<Utc>,
    cursor: PageCursor<OrderSnapshot>,
}

#[async_trait]
impl ItemReader<OrderSnapshot> for RecentOrderReader {
    async fn read(&mut self) -> Result<Option<OrderSnapshot>> {
        if let Some(request) = self.cursor.next_request() {
            let page = self.store.orders_created_since(self.since, request).await?;
            self.cursor.fill(page);
        }
        Ok(self.cursor.buffer.pop_front())
    }
}

struct OrderReportProcessor {
    report_date: DateTime<Utc>,
}

#[async_trait]
impl ItemProcessor<OrderSnapshot, OrderReport> for OrderReportProcessor {
    async fn process(&self, order: OrderSnapshot) -> Result<Option<OrderReport>> {
        Ok(Some(OrderReport {
            order_id: order.order_id,
            user_id: order.user_id,
            user_email: order.user_email,
            order_status: order.status,
            total_amount: order.total_amount,
            total_items: order.total_items,
            order_date: order.order_date,
            report_date: self.report_date,
            report_period: DAILY.to_string(),
        }))
    }
}

struct OrderReportWriter(Arc<dyn ReportStore>);

#[async_trait]
impl ItemWriter<OrderReport> for OrderReportWriter {
    async fn write(&self, items: &[OrderReport]) -> Result<()> {
        self.0.upsert_order_reports(items).await
    }
}

/// Reports every order created in the 24 hours before the run.
pub struct OrderReportJob {
    store: Arc<dyn ReportStore>,
    clock: Arc<dyn Clock>,
    step: ChunkStep,
}

impl OrderReportJob {
    /// Create the job over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            step: ChunkStep::new("orderReportStep", ORDER_REPORT_CHUNK),
        }
    }
}

#[async_trait]
impl Job for OrderReportJob {
    fn name(&self) -> &'static str {
        ORDER_REPORT_JOB
    }

    async fn execute(&self, _parameters: &JobParameters) -> Result<StepExecution> {
        let now = self.clock.now();
        let mut reader = RecentOrderReader {
            store: Arc::clone(&self.store),
            since: now - Duration::hours(24),
            cursor: PageCursor::new(self.step.chunk_size()),
        };
        let processor = OrderReportProcessor { report_date: now };
        let writer = OrderReportWriter(Arc::clone(&self.store));
        self.step.execute(&mut reader, &processor, &writer).await
    }
}

struct ActiveUserReader {
    store: Arc<dyn ReportStore>,
    cursor: PageCursor<UserSnapshot>,
}

#[async_trait]
impl ItemReader<UserSnapshot> for ActiveUserReader {
    async fn read(&mut self) -> Result<Option<UserSnapshot>> {
        if let Some(request) = self.cursor.next_request() {
            let page = self.store.active_users(request).await?;
            self.cursor.fill(page);
        }
        Ok(self.cursor.buffer.pop_front())
    }
}

struct UserStatisticsProcessor {
    statistics_date: NaiveDate,
}

#[async_trait]
impl ItemProcessor<UserSnapshot, UserStatistics> for UserStatisticsProcessor {
    async fn process(&self, user: UserSnapshot) -> Result<Option<UserStatistics>> {
        Ok(Some(UserStatistics {
            user_id: user.user_id,
            user_name: user.name,
            user_email: user.email,
            user_role: user.role,
            registration_date: user.created_at,
            last_active_date: Some(user.updated_at),
            is_active: user.status == UserStatus::Active,
            statistics_date: self.statistics_date,
        }))
    }
}

struct UserStatisticsWriter(Arc<dyn ReportStore>);

#[async_trait]
impl ItemWriter<UserStatistics> for UserStatisticsWriter {
    async fn write(&self, items: &[UserStatistics]) -> Result<()> {
        self.0.upsert_user_statistics(items).await
    }
}

/// Snapshots every active user for the current UTC day.
pub struct UserStatisticsJob {
    store: Arc<dyn ReportStore>,
    clock: Arc<dyn Clock>,
    step: ChunkStep,
}

impl UserStatisticsJob {
    /// Create the job over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            step: ChunkStep::new("userStatisticsStep", USER_STATISTICS_CHUNK),
        }
    }
}

#[async_trait]
impl Job for UserStatisticsJob {
    fn name(&self) -> &'static str {
        USER_STATISTICS_JOB
    }

    async fn execute(&self, _parameters: &JobParameters) -> Result<StepExecution> {
        let mut reader = ActiveUserReader {
            store: Arc::clone(&self.store),
            cursor: PageCursor::new(self.step.chunk_size()),
        };
        let processor = UserStatisticsProcessor {
            statistics_date: self.clock.now().date_naive(),
        };
        let writer = UserStatisticsWriter(Arc::clone(&self.store));
        self.step.execute(&mut reader, &processor, &writer).await
    }
}
