//! Manual batch job control for administrators.

use crate::auth::RequireAdmin;
use crate::state::AppState;
use axum::extract::State;
use serde::Serialize;
use shopfront_batch::{
    BatchError, JobExecution, JobParameters, JobStatus, ORDER_REPORT_JOB, USER_STATISTICS_JOB,
};
use shopfront_core::{DateTime, Utc};
use shopfront_web::{ApiPath, ApiResponse, AppError, WebResult};

const RECENT_EXECUTIONS: usize = 5;

/// Outcome of a manual launch.
#[derive(Debug, Clone, Serialize)]
pub struct JobLaunchResponse {
    /// Execution id
    pub job_id: u64,
    /// Job name
    pub job_name: String,
    /// Final status of the run
    pub status: JobStatus,
    /// When the run started
    pub start_time: DateTime<Utc>,
    /// Human-readable summary
    pub message: String,
}

impl From<JobExecution> for JobLaunchResponse {
    fn from(execution: JobExecution) -> Self {
        let message = match execution.status {
            JobStatus::Completed => format!("Job {} completed", execution.job_name),
            JobStatus::Failed => format!(
                "Job {} failed: {}",
                execution.job_name,
                execution.exit_message.as_deref().unwrap_or("unknown error")
            ),
            JobStatus::Starting | JobStatus::Started => {
                format!("Job {} started", execution.job_name)
            }
        };
        Self {
            job_id: execution.id,
            job_name: execution.job_name,
            status: execution.status,
            start_time: execution.start_time,
            message,
        }
    }
}

/// One line of a job's history.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    /// Execution id
    pub execution_id: u64,
    /// Status
    pub status: JobStatus,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// End time, if finished
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds, as `"12s"`, or `"Running"`
    pub duration: String,
}

impl From<&JobExecution> for ExecutionSummary {
    fn from(execution: &JobExecution) -> Self {
        let duration = execution.duration().map_or_else(
            || "Running".to_string(),
            |d| format!("{}s", d.num_seconds()),
        );
        Self {
            execution_id: execution.id,
            status: execution.status,
            start_time: execution.start_time,
            end_time: execution.end_time,
            duration,
        }
    }
}

/// Recent history of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusResponse {
    /// Job name
    pub job_name: String,
    /// Newest first
    pub recent_executions: Vec<ExecutionSummary>,
}

/// Registered jobs.
#[derive(Debug, Clone, Serialize)]
pub struct JobListResponse {
    /// Number of registered jobs
    pub total_jobs: usize,
    /// Their names
    pub job_names: Vec<&'static str>,
}

fn batch_error(error: BatchError) -> AppError {
    match error {
        BatchError::AlreadyRunning(name) => {
            AppError::conflict(format!("Job '{name}' is already running")).with_code("BATCH_001")
        }
        BatchError::UnknownJob(name) => AppError::not_found("Job", name),
        other => AppError::internal("Batch job could not be started")
            .with_source(anyhow::Error::new(other)),
    }
}

async fn launch(
    state: &AppState,
    job_name: &str,
    admin: &str,
) -> WebResult<ApiResponse<JobLaunchResponse>> {
    let parameters = JobParameters::new()
        .with("requestedAt", Utc::now().to_rfc3339())
        .with("requestedBy", admin)
        .with("trigger", "manual");
    let execution = state
        .batch
        .run(job_name, parameters)
        .await
        .map_err(batch_error)?;
    Ok(ApiResponse::ok(JobLaunchResponse::from(execution)))
}

/// `POST /api/v1/batch/jobs/order-report`
pub async fn run_order_report(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> WebResult<ApiResponse<JobLaunchResponse>> {
    launch(&state, ORDER_REPORT_JOB, &admin.user_id.to_string()).await
}

/// `POST /api/v1/batch/jobs/user-statistics`
pub async fn run_user_statistics(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> WebResult<ApiResponse<JobLaunchResponse>> {
    launch(&state, USER_STATISTICS_JOB, &admin.user_id.to_string()).await
}

/// `GET /api/v1/batch/jobs/:name/status`
///
/// 404 when the job has never run.
pub async fn job_status(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(job_name): ApiPath<String>,
) -> WebResult<ApiResponse<JobStatusResponse>> {
    let recent = state.batch.repository().recent(&job_name, RECENT_EXECUTIONS);
    if recent.is_empty() {
        return Err(AppError::not_found("Job executions", job_name));
    }
    Ok(ApiResponse::ok(JobStatusResponse {
        recent_executions: recent.iter().map(ExecutionSummary::from).collect(),
        job_name,
    }))
}

/// `GET /api/v1/batch/jobs`
pub async fn list_jobs(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResponse<JobListResponse> {
    let job_names = state.batch.job_names();
    ApiResponse::ok(JobListResponse {
        total_jobs: job_names.len(),
        job_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Duration;

    fn execution(status: JobStatus, seconds: Option<i64>) -> JobExecution {
        let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        JobExecution {
            id: 7,
            job_name: ORDER_REPORT_JOB.to_string(),
            parameters: JobParameters::new(),
            status,
            start_time: start,
            end_time: seconds.map(|s| start + Duration::seconds(s)),
            step: None,
            exit_message: Some("disk full".to_string()),
        }
    }

    #[test]
    fn durations_render_as_seconds_or_running() {
        let done = ExecutionSummary::from(&execution(JobStatus::Completed, Some(42)));
        assert_eq!(done.duration, "42s");

        let running = ExecutionSummary::from(&execution(JobStatus::Started, None));
        assert_eq!(running.duration, "Running");
    }

    #[test]
    fn failed_launch_message_carries_the_reason() {
        let response = JobLaunchResponse::from(execution(JobStatus::Failed, Some(1)));
        assert_eq!(response.job_id, 7);
        assert!(response.message.contains("disk full"));
    }

    #[test]
    fn batch_errors_map_to_statuses() {
        let busy = batch_error(BatchError::AlreadyRunning(ORDER_REPORT_JOB.to_string()));
        assert_eq!(busy.status(), StatusCode::CONFLICT);
        assert_eq!(busy.code(), "BATCH_001");

        let unknown = batch_error(BatchError::UnknownJob("nope".to_string()));
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
