//! # Shopfront Batch
//!
//! Chunked batch jobs over the Shopfront store and the cron scheduler that
//! drives them.
//!
//! ## Pieces
//!
//! - [`ChunkStep`]: read, process and write items in fixed-size chunks
//! - [`Job`] and [`JobLauncher`]: named jobs, one execution at a time, with
//!   an in-memory [`JobRepository`] history
//! - [`ReportStore`]: where the jobs read orders and users and write
//!   reports, backed by `PostgreSQL` or the repository traits
//! - [`JobScheduler`]: fires jobs on cron expressions in UTC
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shopfront_batch::{
//!     BatchConfig, InMemoryReportStore, JobLauncher, JobRepository, JobScheduler,
//!     OrderReportJob, ReportStore, UserStatisticsJob,
//! };
//! use shopfront_core::environment::{Clock, SystemClock};
//! # async fn example(
//! #     orders: Arc<dyn shopfront_core::providers::OrderRepository>,
//! #     users: Arc<dyn shopfront_core::providers::UserRepository>,
//! # ) -> shopfront_batch::Result<()> {
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let store: Arc<dyn ReportStore> = Arc::new(InMemoryReportStore::new(orders, users));
//! let launcher = JobLauncher::new(JobRepository::new(), Arc::clone(&clock))
//!     .register(Arc::new(OrderReportJob::new(Arc::clone(&store), Arc::clone(&clock))))
//!     .register(Arc::new(UserStatisticsJob::new(store, Arc::clone(&clock))));
//!
//! let (scheduler, shutdown) = JobScheduler::new(launcher, &BatchConfig::default(), clock)?;
//! let handle = tokio::spawn(scheduler.run());
//! // ...
//! shutdown.send(true).ok();
//! handle.await.ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod jobs;
pub mod launcher;
pub mod listener;
pub mod report;
pub mod scheduler;
pub mod step;

pub use config::{BatchConfig, DEFAULT_ORDER_REPORT_CRON, DEFAULT_USER_STATISTICS_CRON};
pub use error::{BatchError, Result};
pub use job::{Job, JobExecution, JobParameters, JobRepository, JobStatus};
pub use jobs::{ORDER_REPORT_JOB, OrderReportJob, USER_STATISTICS_JOB, UserStatisticsJob};
pub use launcher::JobLauncher;
pub use listener::{JobExecutionListener, LoggingJobListener};
pub use report::{
    InMemoryReportStore, OrderReport, OrderSnapshot, PgReportStore, ReportStore, UserSnapshot,
    UserStatistics,
};
pub use scheduler::{JobScheduler, parse_schedule};
pub use step::{ChunkStep, ItemProcessor, ItemReader, ItemWriter, StepExecution};

/// Describe the batch metrics so the exporter lists them before first use.
pub fn register_batch_metrics() {
    metrics::describe_counter!(
        "shopfront_batch_jobs_total",
        "Finished job executions by job and status"
    );
    metrics::describe_counter!(
        "shopfront_batch_jobs_rejected_total",
        "Launches refused because the job was already running"
    );
    metrics::describe_counter!(
        "shopfront_batch_items_written_total",
        "Items written by completed jobs"
    );
    metrics::describe_histogram!(
        "shopfront_batch_job_duration_seconds",
        metrics::Unit::Seconds,
        "Job execution wall time"
    );
}
