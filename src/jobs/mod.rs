//! Scheduled maintenance jobs, triggered over HTTP by the platform cron.
//!
//! Jobs run in service mode: they read across every tenant, so nothing on a
//! request path is allowed to reach them except the secret-gated cron routes.

pub mod okr_analysis;
pub mod weekly_report;

use async_trait::async_trait;
use serde_json::Value;

use crate::database::manager::DatabaseError;

pub use okr_analysis::OkrAnalysisJob;
pub use weekly_report::WeeklyReportJob;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job '{0}' is disabled")]
    Disabled(&'static str),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Name used in logs and error payloads.
    fn name(&self) -> &'static str;

    /// Whether this deployment has the job switched on.
    fn enabled(&self) -> bool;

    /// Runs the job and returns a JSON run summary for the cron response.
    async fn run(&self) -> Result<Value, JobError>;
}

/// Gates on the feature flag, then runs the job with timing logs.
pub async fn execute(job: &dyn ScheduledJob) -> Result<Value, JobError> {
    if !job.enabled() {
        return Err(JobError::Disabled(job.name()));
    }

    let started = std::time::Instant::now();
    tracing::info!("Job '{}' started", job.name());

    match job.run().await {
        Ok(summary) => {
            tracing::info!("Job '{}' finished in {:?}", job.name(), started.elapsed());
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(
                "Job '{}' failed after {:?}: {}",
                job.name(),
                started.elapsed(),
                e
            );
            Err(e)
        }
    }
}
