// handlers/public/webhooks.rs - POST /webhooks/email

use axum::body::Bytes;
use serde_json::{json, Value};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::scope::CompanyScope;
use crate::email::{parse_webhook_event, ParsedEmailEvent};
use crate::middleware::ApiResponse;

/// POST /webhooks/email - Provider delivery event sink
///
/// Acknowledges with 200 unconditionally. A failed acknowledgement makes
/// the provider retry and eventually disable the endpoint, so parse and
/// database failures are logged and swallowed.
pub async fn email_event(body: Bytes) -> ApiResponse<Value> {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Email webhook body was not JSON: {}", e);
            json!({ "raw": String::from_utf8_lossy(&body) })
        }
    };

    let event = parse_webhook_event(&payload);
    if let Err(e) = store_event(&event, &payload).await {
        tracing::error!("Failed to store email event '{}': {}", event.event_type, e);
    }

    ApiResponse::success(json!({ "received": true }))
}

async fn store_event(event: &ParsedEmailEvent, payload: &Value) -> Result<(), DatabaseError> {
    let pool = DatabaseManager::pool().await?;
    let mut scope = CompanyScope::service(&pool).await?;

    sqlx::query(
        "INSERT INTO email_events (provider_message_id, event_type, recipient, payload) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&event.provider_message_id)
    .bind(&event.event_type)
    .bind(&event.recipient)
    .bind(payload)
    .execute(scope.conn())
    .await?;

    scope.commit().await
}
