//! Runs registered jobs and records their executions.

use crate::error::{BatchError, Result};
use crate::job::{Job, JobExecution, JobParameters, JobRepository, JobStatus};
use crate::listener::{JobExecutionListener, LoggingJobListener};
use shopfront_core::environment::{Clock, SystemClock};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Runs jobs by name, one execution per job at a time.
#[derive(Clone)]
pub struct JobLauncher {
    jobs: BTreeMap<&'static str, Arc<dyn Job>>,
    repository: JobRepository,
    listener: Arc<dyn JobExecutionListener>,
    clock: Arc<dyn Clock>,
    running: Arc<Mutex<HashSet<&'static str>>>,
}

/// Removes the job from the running set when the run ends, even on panic.
struct RunningGuard<'a> {
    running: &'a Mutex<HashSet<&'static str>>,
    name: &'static str,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.name);
    }
}

impl JobLauncher {
    /// Create a launcher with the logging listener.
    #[must_use]
    pub fn new(repository: JobRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: BTreeMap::new(),
            repository,
            listener: Arc::new(LoggingJobListener),
            clock,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Launcher on the system clock with a fresh history.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(JobRepository::new(), Arc::new(SystemClock))
    }

    /// Replace the listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn JobExecutionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Register a job under its name, replacing any previous one.
    #[must_use]
    pub fn register(mut self, job: Arc<dyn Job>) -> Self {
        self.jobs.insert(job.name(), job);
        self
    }

    /// Execution history.
    #[must_use]
    pub const fn repository(&self) -> &JobRepository {
        &self.repository
    }

    /// Registered job names, sorted.
    #[must_use]
    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.keys().copied().collect()
    }

    /// Run `job_name` to completion and return the recorded execution.
    ///
    /// A job failure is recorded as a `FAILED` execution, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::UnknownJob`] if nothing is registered under the
    /// name, or [`BatchError::AlreadyRunning`] if an execution is in flight.
    pub async fn run(&self, job_name: &str, parameters: JobParameters) -> Result<JobExecution> {
        let (name, job) = self
            .jobs
            .get_key_value(job_name)
            .map(|(name, job)| (*name, Arc::clone(job)))
            .ok_or_else(|| BatchError::UnknownJob(job_name.to_string()))?;

        let _guard = {
            let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            if !running.insert(name) {
                metrics::counter!("shopfront_batch_jobs_rejected_total", "job" => name)
                    .increment(1);
                return Err(BatchError::AlreadyRunning(name.to_string()));
            }
            RunningGuard {
                running: &self.running,
                name,
            }
        };

        let mut execution = self.repository.create(name, parameters, self.clock.now());
        self.listener.before_job(&execution);
        execution.status = JobStatus::Started;
        self.repository.update(&execution);

        let outcome = job.execute(&execution.parameters).await;
        execution.finish(&outcome, self.clock.now());
        self.repository.update(&execution);

        metrics::counter!(
            "shopfront_batch_jobs_total",
            "job" => name,
            "status" => execution.status.as_str()
        )
        .increment(1);
        if let Some(duration) = execution.duration() {
            metrics::histogram!("shopfront_batch_job_duration_seconds", "job" => name)
                .record(duration.num_milliseconds() as f64 / 1000.0);
        }
        if let Some(step) = &execution.step {
            metrics::counter!("shopfront_batch_items_written_total", "job" => name)
                .increment(step.write_count);
        }

        self.listener.after_job(&execution);
        Ok(execution)
    }
}

impl std::fmt::Debug for JobLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLauncher")
            .field("jobs", &self.job_names())
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}
