//! Email delivery through the provider's HTTP API, plus lenient parsing of
//! the webhook events the provider posts back at us.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::config;
use crate::services::reports::WeeklyMetrics;

/// Timeout for provider requests. Delivery is best-effort and always happens
/// after the surrounding transaction commits, so a short cap is fine.
const SEND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email provider request failed: {0}")]
    Network(String),
    #[error("email provider rejected the message: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

pub struct EmailClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from_address: String,
}

impl EmailClient {
    /// None when delivery is disabled or no API key is configured. Callers
    /// treat that as "skip sending", never as a failure.
    pub fn from_config() -> Option<Self> {
        let email = &config().email;
        if !email.enabled || email.api_key.is_empty() {
            return None;
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .ok()?;

        Some(Self {
            http,
            base_url: email.base_url.trim_end_matches('/').to_string(),
            api_key: email.api_key.clone(),
            from_address: email.from_address.clone(),
        })
    }

    pub async fn send_invitation(
        &self,
        to: &str,
        company_name: &str,
        inviter_name: &str,
        accept_url: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("You've been invited to join {} on Compass", company_name);
        let html = invitation_body(company_name, inviter_name, accept_url);
        self.send(to, subject, html).await
    }

    pub async fn send_report_summary(
        &self,
        to: &str,
        company_name: &str,
        metrics: &WeeklyMetrics,
    ) -> Result<(), EmailError> {
        let subject = format!("Weekly OKR report for {}", company_name);
        let html = report_body(company_name, metrics);
        self.send(to, subject, html).await
    }

    async fn send(&self, to: &str, subject: String, html: String) -> Result<(), EmailError> {
        let url = format!("{}/emails", self.base_url);
        let body = SendEmailRequest {
            from: &self.from_address,
            to: [to],
            subject,
            html,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(EmailError::Rejected(format!("{}: {}", status, snippet(&detail))))
        }
    }
}

fn invitation_body(company_name: &str, inviter_name: &str, accept_url: &str) -> String {
    format!(
        "<p>{} invited you to join <strong>{}</strong> on Compass.</p>\
         <p><a href=\"{}\">Accept the invitation</a></p>\
         <p>The link expires; if it has, ask for a new invitation.</p>",
        escape_html(inviter_name),
        escape_html(company_name),
        escape_html(accept_url),
    )
}

fn report_body(company_name: &str, metrics: &WeeklyMetrics) -> String {
    let mut body = format!(
        "<p>Weekly OKR summary for <strong>{}</strong>:</p>\
         <ul><li>Objectives: {}</li><li>Completed: {}</li>\
         <li>At risk: {}</li><li>Average progress: {:.0}%</li></ul>",
        escape_html(company_name),
        metrics.total,
        metrics.completed,
        metrics.at_risk,
        metrics.avg_progress,
    );
    if !metrics.by_department.is_empty() {
        body.push_str("<p>By department:</p><ul>");
        for (department, stats) in &metrics.by_department {
            body.push_str(&format!(
                "<li>{}: {} objectives, {:.0}% average</li>",
                escape_html(department),
                stats.total,
                stats.avg_progress,
            ));
        }
        body.push_str("</ul>");
    }
    body
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Char-boundary safe truncation for provider error bodies.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Fields lifted out of a provider webhook event. Parsing never fails:
/// anything unrecognized lands as event type "unknown" and the raw payload
/// is stored verbatim alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEmailEvent {
    pub provider_message_id: Option<String>,
    pub event_type: String,
    pub recipient: Option<String>,
}

pub fn parse_webhook_event(payload: &Value) -> ParsedEmailEvent {
    let event_type = payload
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("unknown")
        .to_string();

    let data = payload.get("data");
    let provider_message_id = data
        .and_then(|d| d.get("email_id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let recipient = data.and_then(|d| d.get("to")).and_then(first_address);

    ParsedEmailEvent {
        provider_message_id,
        event_type,
        recipient,
    }
}

// The provider sends `to` as either a single address or an array of them.
fn first_address(to: &Value) -> Option<String> {
    match to {
        Value::String(address) => {
            let trimmed = address.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Array(items) => items.iter().find_map(|item| {
            item.as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_webhook_event_delivered() {
        let payload = json!({
            "type": "email.delivered",
            "created_at": "2025-08-18T09:00:00Z",
            "data": {
                "email_id": "msg_123",
                "to": ["person@example.com", "other@example.com"],
                "subject": "hello"
            }
        });
        let event = parse_webhook_event(&payload);
        assert_eq!(event.event_type, "email.delivered");
        assert_eq!(event.provider_message_id.as_deref(), Some("msg_123"));
        assert_eq!(event.recipient.as_deref(), Some("person@example.com"));
    }

    #[test]
    fn test_parse_webhook_event_string_recipient() {
        let payload = json!({
            "type": "email.bounced",
            "data": { "to": "solo@example.com" }
        });
        let event = parse_webhook_event(&payload);
        assert_eq!(event.recipient.as_deref(), Some("solo@example.com"));
        assert_eq!(event.provider_message_id, None);
    }

    #[test]
    fn test_parse_webhook_event_never_fails() {
        let payload = json!({"whatever": [1, 2, 3]});
        let event = parse_webhook_event(&payload);
        assert_eq!(event.event_type, "unknown");
        assert_eq!(event.provider_message_id, None);
        assert_eq!(event.recipient, None);

        let blank_type = json!({"type": "   ", "data": {"to": []}});
        assert_eq!(parse_webhook_event(&blank_type).event_type, "unknown");
    }

    #[test]
    fn test_invitation_body_escapes_names() {
        let body = invitation_body("Acme <Corp>", "Eve & Co", "https://app/invitations/tok");
        assert!(body.contains("Acme &lt;Corp&gt;"));
        assert!(body.contains("Eve &amp; Co"));
        assert!(body.contains("https://app/invitations/tok"));
    }

    #[test]
    fn test_report_body_lists_departments() {
        use crate::services::reports::DepartmentStats;
        use std::collections::BTreeMap;

        let mut by_department = BTreeMap::new();
        by_department.insert(
            "Engineering".to_string(),
            DepartmentStats { total: 4, avg_progress: 62.5 },
        );
        let metrics = WeeklyMetrics {
            total: 6,
            completed: 1,
            at_risk: 2,
            avg_progress: 48.0,
            by_department,
        };
        let body = report_body("Acme", &metrics);
        assert!(body.contains("Objectives: 6"));
        assert!(body.contains("At risk: 2"));
        assert!(body.contains("Engineering: 4 objectives, 62% average"));
    }
}
