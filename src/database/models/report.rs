use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One company's weekly objective snapshot. Unique per
/// `(company_id, week_start)`; reruns overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeeklyReport {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Monday of the ISO week the report covers.
    pub week_start: NaiveDate,
    pub total_objectives: i32,
    pub completed_objectives: i32,
    pub at_risk_objectives: i32,
    pub avg_progress: f64,
    /// Per-department breakdown, shape owned by the report job.
    pub summary: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

/// AI risk assessment of a single objective, produced by the analysis job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OkrAnalysis {
    pub id: Uuid,
    pub company_id: Uuid,
    pub objective_id: Uuid,
    pub risk_level: String,
    pub summary: String,
    /// Model identifier the provider reported for this completion.
    pub model: String,
    pub generated_at: DateTime<Utc>,
}
