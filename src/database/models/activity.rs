use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Todo,
    Doing,
    Done,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Todo => "todo",
            ActivityStatus::Doing => "doing",
            ActivityStatus::Done => "done",
        }
    }
}

/// Smallest unit of work, belongs to an initiative. Flipping one to `done`
/// feeds the parent initiative's progress roll-up.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub company_id: Uuid,
    pub initiative_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub status: ActivityStatus,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
