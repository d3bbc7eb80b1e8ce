//! Client for the OpenAI-compatible chat-completions backend that powers
//! initiative suggestions and objective health analysis.
//!
//! Prompt assembly and response parsing are plain functions so they can be
//! tested without network access.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::config;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI suggestions are disabled")]
    Disabled,
    #[error("AI provider request failed: {0}")]
    Upstream(String),
    #[error("AI provider returned malformed payload: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    InvalidInput(String),
}

/// Objective fields the caller has on hand when asking for suggestions.
/// The objective does not have to exist yet.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveDraft {
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeSuggestion {
    pub title: String,
    pub description: String,
}

/// Snapshot of a stored objective handed to the analysis prompt.
#[derive(Debug, Clone)]
pub struct ObjectiveOutline {
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub progress: i32,
    pub quarter: i32,
    pub year: i32,
    pub initiatives: Vec<InitiativeOutline>,
}

#[derive(Debug, Clone)]
pub struct InitiativeOutline {
    pub title: String,
    pub status: String,
    pub progress: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveAnalysis {
    pub risk_level: String,
    pub summary: String,
    pub suggested_actions: Vec<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_suggestions: usize,
}

impl AiClient {
    /// Errors with `Disabled` when the feature flag is off or no API key is
    /// configured, which callers surface as 503.
    pub fn from_config() -> Result<Self, AiError> {
        let ai = &config().ai;
        if !ai.enabled || ai.api_key.is_empty() {
            return Err(AiError::Disabled);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ai.timeout_secs))
            .build()
            .map_err(|e| AiError::Upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: ai.base_url.trim_end_matches('/').to_string(),
            api_key: ai.api_key.clone(),
            model: ai.model.clone(),
            max_suggestions: ai.max_suggestions,
        })
    }

    /// Model identifier recorded alongside stored analyses.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn suggest_initiatives(
        &self,
        draft: &ObjectiveDraft,
    ) -> Result<Vec<InitiativeSuggestion>, AiError> {
        if draft.title.trim().is_empty() {
            return Err(AiError::InvalidInput(
                "Objective title is required for suggestions".to_string(),
            ));
        }

        let prompt = suggestion_prompt(draft, self.max_suggestions);
        let content = self.chat(SUGGESTION_SYSTEM, prompt).await?;
        parse_suggestions(&content, self.max_suggestions)
    }

    pub async fn analyze_objective(
        &self,
        outline: &ObjectiveOutline,
    ) -> Result<ObjectiveAnalysis, AiError> {
        let prompt = analysis_prompt(outline);
        let content = self.chat(ANALYSIS_SYSTEM, prompt).await?;
        parse_analysis(&content)
    }

    async fn chat(&self, system: &str, user_prompt: String) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system.to_string() },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: 0.2,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AiError::Upstream(format!("{}: {}", status, snippet(&detail))));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AiError::MalformedResponse("completion had no choices".to_string()))
    }
}

const SUGGESTION_SYSTEM: &str = "You help teams break OKR objectives into concrete initiatives. \
Reply with JSON only: {\"suggestions\": [{\"title\": string, \"description\": string}]}.";

const ANALYSIS_SYSTEM: &str = "You assess the delivery health of OKR objectives. \
Reply with JSON only: {\"risk_level\": \"low\"|\"medium\"|\"high\", \"summary\": string, \
\"suggested_actions\": [string]}.";

fn suggestion_prompt(draft: &ObjectiveDraft, count: usize) -> String {
    let mut prompt = format!(
        "Suggest up to {} initiatives for this objective.\nTitle: {}",
        count,
        draft.title.trim()
    );
    if let Some(description) = draft.description.as_deref().filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!("\nDescription: {}", description.trim()));
    }
    if let Some(department) = draft.department.as_deref().filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!("\nDepartment: {}", department.trim()));
    }
    prompt
}

fn analysis_prompt(outline: &ObjectiveOutline) -> String {
    let mut prompt = format!(
        "Assess this objective.\nTitle: {}\nStatus: {}\nProgress: {}%\nPeriod: Q{} {}",
        outline.title.trim(),
        outline.status,
        outline.progress,
        outline.quarter,
        outline.year
    );
    if let Some(description) = outline.description.as_deref().filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!("\nDescription: {}", description.trim()));
    }
    if outline.initiatives.is_empty() {
        prompt.push_str("\nInitiatives: none yet");
    } else {
        prompt.push_str("\nInitiatives:");
        for initiative in &outline.initiatives {
            prompt.push_str(&format!(
                "\n- {} ({}, {}%)",
                initiative.title.trim(),
                initiative.status,
                initiative.progress
            ));
        }
    }
    prompt
}

#[derive(Deserialize)]
struct SuggestionPayload {
    suggestions: Vec<SuggestionEntry>,
}

#[derive(Deserialize)]
struct SuggestionEntry {
    title: String,
    #[serde(default)]
    description: String,
}

fn parse_suggestions(content: &str, cap: usize) -> Result<Vec<InitiativeSuggestion>, AiError> {
    let payload: SuggestionPayload = serde_json::from_str(content)
        .map_err(|e| AiError::MalformedResponse(format!("suggestion payload: {}", e)))?;

    let suggestions: Vec<InitiativeSuggestion> = payload
        .suggestions
        .into_iter()
        .filter(|entry| !entry.title.trim().is_empty())
        .take(cap)
        .map(|entry| InitiativeSuggestion {
            title: entry.title.trim().to_string(),
            description: entry.description.trim().to_string(),
        })
        .collect();

    if suggestions.is_empty() {
        return Err(AiError::MalformedResponse(
            "no usable suggestions in completion".to_string(),
        ));
    }
    Ok(suggestions)
}

#[derive(Deserialize)]
struct AnalysisPayload {
    risk_level: String,
    summary: String,
    #[serde(default)]
    suggested_actions: Vec<String>,
}

fn parse_analysis(content: &str) -> Result<ObjectiveAnalysis, AiError> {
    let payload: AnalysisPayload = serde_json::from_str(content)
        .map_err(|e| AiError::MalformedResponse(format!("analysis payload: {}", e)))?;

    let risk_level = payload.risk_level.trim().to_lowercase();
    if !matches!(risk_level.as_str(), "low" | "medium" | "high") {
        return Err(AiError::MalformedResponse(format!(
            "unknown risk level '{}'",
            payload.risk_level
        )));
    }
    if payload.summary.trim().is_empty() {
        return Err(AiError::MalformedResponse("analysis summary was empty".to_string()));
    }

    Ok(ObjectiveAnalysis {
        risk_level,
        summary: payload.summary.trim().to_string(),
        suggested_actions: payload
            .suggested_actions
            .into_iter()
            .map(|action| action.trim().to_string())
            .filter(|action| !action.is_empty())
            .collect(),
    })
}

// Char-boundary safe truncation for provider error bodies.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ObjectiveDraft {
        ObjectiveDraft {
            title: "Reduce churn".to_string(),
            description: Some("Focus on the first 30 days".to_string()),
            department: Some("Customer Success".to_string()),
        }
    }

    #[test]
    fn test_suggestion_prompt_includes_context() {
        let prompt = suggestion_prompt(&draft(), 5);
        assert!(prompt.contains("up to 5 initiatives"));
        assert!(prompt.contains("Reduce churn"));
        assert!(prompt.contains("first 30 days"));
        assert!(prompt.contains("Customer Success"));
    }

    #[test]
    fn test_suggestion_prompt_skips_blank_fields() {
        let draft = ObjectiveDraft {
            title: "Reduce churn".to_string(),
            description: Some("   ".to_string()),
            department: None,
        };
        let prompt = suggestion_prompt(&draft, 3);
        assert!(!prompt.contains("Description:"));
        assert!(!prompt.contains("Department:"));
    }

    #[test]
    fn test_parse_suggestions_caps_and_trims() {
        let content = r#"{"suggestions": [
            {"title": "  Onboarding emails ", "description": " Drip series "},
            {"title": "Health score", "description": "Weekly review"},
            {"title": "", "description": "skipped"},
            {"title": "Exit interviews", "description": ""}
        ]}"#;
        let suggestions = parse_suggestions(content, 2).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].title, "Onboarding emails");
        assert_eq!(suggestions[0].description, "Drip series");
    }

    #[test]
    fn test_parse_suggestions_rejects_junk() {
        assert!(matches!(
            parse_suggestions("not json", 5),
            Err(AiError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_suggestions(r#"{"suggestions": []}"#, 5),
            Err(AiError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_suggestions(r#"{"suggestions": [{"title": "   "}]}"#, 5),
            Err(AiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_analysis_normalizes_risk_level() {
        let content = r#"{"risk_level": "HIGH", "summary": "Progress stalled.",
            "suggested_actions": [" Re-scope Q3 ", ""]}"#;
        let analysis = parse_analysis(content).unwrap();
        assert_eq!(analysis.risk_level, "high");
        assert_eq!(analysis.summary, "Progress stalled.");
        assert_eq!(analysis.suggested_actions, vec!["Re-scope Q3".to_string()]);
    }

    #[test]
    fn test_parse_analysis_rejects_unknown_risk() {
        let content = r#"{"risk_level": "catastrophic", "summary": "Bad."}"#;
        assert!(matches!(
            parse_analysis(content),
            Err(AiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_analysis_prompt_lists_initiatives() {
        let outline = ObjectiveOutline {
            title: "Ship v2".to_string(),
            description: None,
            status: "active".to_string(),
            progress: 40,
            quarter: 3,
            year: 2025,
            initiatives: vec![InitiativeOutline {
                title: "Beta program".to_string(),
                status: "in_progress".to_string(),
                progress: 60,
            }],
        };
        let prompt = analysis_prompt(&outline);
        assert!(prompt.contains("Q3 2025"));
        assert!(prompt.contains("Beta program (in_progress, 60%)"));
    }
}
