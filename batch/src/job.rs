//! Jobs, their executions and the execution history.

use crate::error::Result;
use crate::step::StepExecution;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Named string parameters passed to a job run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JobParameters(BTreeMap<String, String>);

impl JobParameters {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A runnable batch job.
#[async_trait]
pub trait Job: Send + Sync {
    /// Registry name, e.g. `orderReportJob`.
    fn name(&self) -> &'static str;

    /// Run the job to completion.
    ///
    /// # Errors
    ///
    /// Returns error if any step fails.
    async fn execute(&self, parameters: &JobParameters) -> Result<StepExecution>;
}

/// Lifecycle of a job execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Recorded, not yet running
    Starting,
    /// Running
    Started,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// Upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether the execution is still in flight.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of a job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobExecution {
    /// Execution id, unique per process
    pub id: u64,
    /// Job that ran
    pub job_name: String,
    /// Parameters the run was launched with
    pub parameters: JobParameters,
    /// Current status
    pub status: JobStatus,
    /// When the execution was recorded
    pub start_time: DateTime<Utc>,
    /// When the job finished
    pub end_time: Option<DateTime<Utc>>,
    /// Step counters, once completed
    pub step: Option<StepExecution>,
    /// Failure message
    pub exit_message: Option<String>,
}

impl JobExecution {
    /// Wall time between start and end, if finished.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Mark the execution finished with the step outcome.
    pub fn finish(&mut self, outcome: &Result<StepExecution>, now: DateTime<Utc>) {
        self.end_time = Some(now);
        match outcome {
            Ok(step) => {
                self.status = JobStatus::Completed;
                self.step = Some(step.clone());
                self.exit_message = None;
            }
            Err(error) => {
                self.status = JobStatus::Failed;
                self.exit_message = Some(error.to_string());
            }
        }
    }
}

/// Executions kept per job; older finished ones are dropped.
pub const HISTORY_PER_JOB: usize = 20;

/// In-memory history of job executions, bounded by [`HISTORY_PER_JOB`].
#[derive(Debug, Clone, Default)]
pub struct JobRepository {
    executions: Arc<Mutex<Vec<JobExecution>>>,
    sequence: Arc<AtomicU64>,
}

impl JobRepository {
    /// Empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn executions(&self) -> MutexGuard<'_, Vec<JobExecution>> {
        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new execution in `STARTING` state.
    pub fn create(
        &self,
        job_name: &str,
        parameters: JobParameters,
        now: DateTime<Utc>,
    ) -> JobExecution {
        let execution = JobExecution {
            id: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            job_name: job_name.to_string(),
            parameters,
            status: JobStatus::Starting,
            start_time: now,
            end_time: None,
            step: None,
            exit_message: None,
        };
        let mut executions = self.executions();
        executions.push(execution.clone());
        prune(&mut executions, job_name);
        execution
    }

    /// Replace the stored copy of `execution`.
    pub fn update(&self, execution: &JobExecution) {
        let mut executions = self.executions();
        if let Some(stored) = executions.iter_mut().find(|e| e.id == execution.id) {
            *stored = execution.clone();
        }
    }

    /// Look up an execution by id.
    #[must_use]
    pub fn find(&self, id: u64) -> Option<JobExecution> {
        self.executions().iter().find(|e| e.id == id).cloned()
    }

    /// Most recent executions of `job_name`, newest first.
    #[must_use]
    pub fn recent(&self, job_name: &str, limit: usize) -> Vec<JobExecution> {
        self.executions()
            .iter()
            .rev()
            .filter(|e| e.job_name == job_name)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Names of every job with at least one execution, sorted.
    #[must_use]
    pub fn job_names(&self) -> Vec<String> {
        self.executions()
            .iter()
            .map(|e| e.job_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `job_name` has an execution in flight.
    #[must_use]
    pub fn is_running(&self, job_name: &str) -> bool {
        self.executions()
            .iter()
            .any(|e| e.job_name == job_name && e.status.is_running())
    }
}

/// Drop the oldest finished executions of `job_name` beyond the cap.
/// Running executions are always kept.
fn prune(executions: &mut Vec<JobExecution>, job_name: &str) {
    let mut excess = executions
        .iter()
        .filter(|e| e.job_name == job_name)
        .count()
        .saturating_sub(HISTORY_PER_JOB);
    executions.retain(|e| {
        if excess > 0 && e.job_name == job_name && !e.status.is_running() {
            excess -= 1;
            false
        } else {
            true
        }
    });
}
