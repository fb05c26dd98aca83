//! Cron-driven job scheduling.
//!
//! The scheduler sleeps until the earliest upcoming fire time, launches every
//! job due at that instant, and repeats until the shutdown signal flips.
//! Each launch runs on its own task so a slow job does not delay the others;
//! a fire that lands while the previous run is still going is skipped.

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::job::JobParameters;
use crate::jobs::{ORDER_REPORT_JOB, USER_STATISTICS_JOB};
use crate::launcher::JobLauncher;
use chrono::{DateTime, Utc};
use cron::Schedule;
use shopfront_core::environment::Clock;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Parse a six-field cron expression.
///
/// # Errors
///
/// Returns [`BatchError::InvalidSchedule`] if the expression does not parse.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression).map_err(|e| BatchError::InvalidSchedule {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Runs registered jobs on their cron schedules.
pub struct JobScheduler {
    launcher: JobLauncher,
    entries: Vec<(&'static str, Schedule)>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl JobScheduler {
    /// Build a scheduler for the report jobs.
    ///
    /// Returns the scheduler and a shutdown sender. Send `true` to stop it.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidSchedule`] if either expression is bad.
    pub fn new(
        launcher: JobLauncher,
        config: &BatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, watch::Sender<bool>)> {
        let entries = vec![
            (ORDER_REPORT_JOB, parse_schedule(&config.order_report_cron)?),
            (USER_STATISTICS_JOB, parse_schedule(&config.user_statistics_cron)?),
        ];
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok((
            Self {
                launcher,
                entries,
                clock,
                shutdown: shutdown_rx,
            },
            shutdown_tx,
        ))
    }

    /// Earliest fire time strictly after `after`, with the jobs due then.
    #[must_use]
    pub fn next_run(&self, after: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<&'static str>)> {
        let upcoming: Vec<(&'static str, DateTime<Utc>)> = self
            .entries
            .iter()
            .filter_map(|(name, schedule)| schedule.after(&after).next().map(|at| (*name, at)))
            .collect();
        let earliest = upcoming.iter().map(|(_, at)| *at).min()?;
        let due = upcoming
            .into_iter()
            .filter(|(_, at)| *at == earliest)
            .map(|(name, _)| name)
            .collect();
        Some((earliest, due))
    }

    /// Run until shutdown.
    pub async fn run(mut self) {
        tracing::info!(
            jobs = ?self.entries.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            "Batch scheduler started"
        );

        while !*self.shutdown.borrow() {
            let now = self.clock.now();
            let Some((at, due)) = self.next_run(now) else {
                tracing::warn!("No upcoming schedule, batch scheduler idle");
                if self.shutdown.changed().await.is_err() {
                    break;
                }
                continue;
            };
            let wait = (at - now).to_std().unwrap_or_default();
            tracing::debug!(next_run = %at, jobs = ?due, "Waiting for next scheduled run");

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    for name in due {
                        self.launch(name, at);
                    }
                }
                result = self.shutdown.changed() => {
                    if result.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Batch scheduler stopped");
    }

    fn launch(&self, name: &'static str, scheduled_at: DateTime<Utc>) {
        let launcher = self.launcher.clone();
        let parameters = JobParameters::new()
            .with("scheduledAt", scheduled_at.to_rfc3339())
            .with("trigger", "cron");
        tokio::spawn(async move {
            match launcher.run(name, parameters).await {
                Ok(_) => {}
                Err(BatchError::AlreadyRunning(_)) => {
                    tracing::warn!(job = name, "Skipping scheduled run, previous run still active");
                }
                Err(error) => {
                    tracing::error!(job = name, error = %error, "Scheduled run could not start");
                }
            }
        });
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field(
                "jobs",
                &self.entries.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shopfront_testing::test_clock;

    fn scheduler(config: &BatchConfig) -> (JobScheduler, watch::Sender<bool>) {
        JobScheduler::new(JobLauncher::in_memory(), config, Arc::new(test_clock())).unwrap()
    }

    #[test]
    fn default_schedules_fire_in_utc() {
        let (scheduler, _shutdown) = scheduler(&BatchConfig::default());
        let midnight = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let (at, due) = scheduler.next_run(midnight).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 1, 1, 1, 30, 0).unwrap());
        assert_eq!(due, vec![ORDER_REPORT_JOB]);

        let (at, due) = scheduler.next_run(at).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap());
        assert_eq!(due, vec![USER_STATISTICS_JOB]);
    }

    #[test]
    fn simultaneous_fires_are_grouped() {
        let config = BatchConfig::default()
            .with_order_report_cron("0 0 3 * * *")
            .with_user_statistics_cron("0 0 3 * * *");
        let (scheduler, _shutdown) = scheduler(&config);

        let (_, due) = scheduler
            .next_run(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(due, vec![ORDER_REPORT_JOB, USER_STATISTICS_JOB]);
    }

    #[test]
    fn bad_expression_is_rejected() {
        let config = BatchConfig::default().with_order_report_cron("every tuesday");
        let err = JobScheduler::new(JobLauncher::in_memory(), &config, Arc::new(test_clock()))
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidSchedule { ref expression, .. } if expression == "every tuesday"));
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (scheduler, shutdown) = scheduler(&BatchConfig::default());
        let handle = tokio::spawn(scheduler.run());
        shutdown.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
