// handlers/protected/ai.rs - /api/ai suggestion and analysis endpoints

use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::ai::{
    AiClient, InitiativeOutline, InitiativeSuggestion, ObjectiveAnalysis, ObjectiveDraft,
    ObjectiveOutline,
};
use crate::database::list::{ListBuilder, SqlParam};
use crate::database::manager::DatabaseManager;
use crate::database::models::Objective;
use crate::database::scope::CompanyScope;
use crate::database::visibility::Visibility;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentProfile};

/// POST /api/ai/suggestions - Draft initiatives for an objective idea
///
/// Nothing is persisted; the caller decides which suggestions become rows.
pub async fn suggestions(
    Extension(CurrentProfile(_profile)): Extension<CurrentProfile>,
    Json(draft): Json<ObjectiveDraft>,
) -> ApiResult<Vec<InitiativeSuggestion>> {
    let client = AiClient::from_config()?;
    let suggestions = client.suggest_initiatives(&draft).await?;
    Ok(ApiResponse::success(suggestions))
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub objective_id: Uuid,
}

/// POST /api/ai/analysis - Risk read on a stored objective
pub async fn analysis(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<AnalysisRequest>,
) -> ApiResult<ObjectiveAnalysis> {
    let client = AiClient::from_config()?;

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let mut builder = ListBuilder::new(
        "SELECT id, company_id, owner_id, department, title, description, status, progress, \
         quarter, year, created_at, updated_at, deleted_at \
         FROM objectives WHERE deleted_at IS NULL",
    );
    builder.and_eq("id", SqlParam::Uuid(req.objective_id))?;
    Visibility::for_profile(&profile).apply_objectives(&mut builder);
    let objective: Objective = builder
        .fetch_optional(scope.conn())
        .await?
        .ok_or_else(|| ApiError::not_found("Objective not found"))?;

    let rows: Vec<(String, String, i32)> = sqlx::query_as(
        "SELECT title, status, progress FROM initiatives \
         WHERE objective_id = $1 ORDER BY created_at",
    )
    .bind(objective.id)
    .fetch_all(scope.conn())
    .await?;
    scope.commit().await?;

    // The provider call happens after the transaction is released.
    let outline = ObjectiveOutline {
        title: objective.title,
        description: objective.description,
        status: objective.status.as_str().to_string(),
        progress: objective.progress,
        quarter: objective.quarter,
        year: objective.year,
        initiatives: rows
            .into_iter()
            .map(|(title, status, progress)| InitiativeOutline {
                title,
                status,
                progress,
            })
            .collect(),
    };

    let verdict = client.analyze_objective(&outline).await?;
    Ok(ApiResponse::success(verdict))
}
