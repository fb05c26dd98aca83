//! Job lifecycle callbacks.

use crate::job::{JobExecution, JobStatus};

/// Hooks around each job execution.
pub trait JobExecutionListener: Send + Sync {
    /// Called once the execution is recorded, before the job runs.
    fn before_job(&self, execution: &JobExecution);

    /// Called after the job finishes, successfully or not.
    fn after_job(&self, execution: &JobExecution);
}

/// Logs job start and completion.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingJobListener;

impl JobExecutionListener for LoggingJobListener {
    fn before_job(&self, execution: &JobExecution) {
        tracing::info!(
            job = %execution.job_name,
            execution_id = execution.id,
            "Job started"
        );
    }

    fn after_job(&self, execution: &JobExecution) {
        let duration_ms = execution
            .duration()
            .map_or(0, |d| d.num_milliseconds());
        let (read, written) = execution
            .step
            .as_ref()
            .map_or((0, 0), |s| (s.read_count, s.write_count));

        if execution.status == JobStatus::Failed {
            tracing::error!(
                job = %execution.job_name,
                execution_id = execution.id,
                duration_ms,
                error = execution.exit_message.as_deref().unwrap_or_default(),
                "Job failed"
            );
        } else {
            tracing::info!(
                job = %execution.job_name,
                execution_id = execution.id,
                status = %execution.status,
                duration_ms,
                read,
                written,
                "Job finished"
            );
        }
    }
}
