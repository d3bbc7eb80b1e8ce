use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Active,
    Completed,
    Archived,
}

impl ObjectiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveStatus::Active => "active",
            ObjectiveStatus::Completed => "completed",
            ObjectiveStatus::Archived => "archived",
        }
    }
}

/// Quarterly objective. Soft-deleted: rows with `deleted_at` set are
/// excluded from every read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Objective {
    pub id: Uuid,
    pub company_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub department: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: ObjectiveStatus,
    /// 0..=100, recomputed from initiative progress.
    pub progress: i32,
    pub quarter: i32,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
