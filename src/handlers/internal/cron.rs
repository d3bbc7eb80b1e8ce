// handlers/internal/cron.rs - Triggers for the scheduled jobs

use serde_json::Value;

use crate::jobs::{self, OkrAnalysisJob, WeeklyReportJob};
use crate::middleware::{ApiResponse, ApiResult};

/// POST /internal/cron/weekly-report - Compute and store last week's rollup
pub async fn weekly_report() -> ApiResult<Value> {
    let outcome = jobs::execute(&WeeklyReportJob).await?;
    Ok(ApiResponse::success(outcome))
}

/// POST /internal/cron/okr-analysis - Run the stale-objective analysis batch
pub async fn okr_analysis() -> ApiResult<Value> {
    let outcome = jobs::execute(&OkrAnalysisJob).await?;
    Ok(ApiResponse::success(outcome))
}
