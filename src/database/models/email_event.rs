use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Raw delivery event from the email provider's webhook. Not tenant-scoped;
/// the full payload is kept for debugging delivery issues.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailEvent {
    pub id: Uuid,
    pub provider_message_id: Option<String>,
    pub event_type: String,
    pub recipient: Option<String>,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}
