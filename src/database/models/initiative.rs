use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InitiativeStatus {
    Planned,
    InProgress,
    Completed,
    Blocked,
}

impl InitiativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitiativeStatus::Planned => "planned",
            InitiativeStatus::InProgress => "in_progress",
            InitiativeStatus::Completed => "completed",
            InitiativeStatus::Blocked => "blocked",
        }
    }
}

/// Concrete workstream under an objective. Hard-deleted; activities
/// cascade with it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Initiative {
    pub id: Uuid,
    pub company_id: Uuid,
    pub objective_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: InitiativeStatus,
    /// 0..=100, recomputed from activity completion.
    pub progress: i32,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
