// handlers/protected/initiatives.rs - /api/initiatives CRUD

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::list::{ListBuilder, Page, SqlParam};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Initiative, InitiativeStatus, Profile};
use crate::database::scope::CompanyScope;
use crate::database::visibility::Visibility;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentProfile};
use crate::services::progress;

const INITIATIVE_COLUMNS: &str = "id, company_id, objective_id, owner_id, title, description, \
     status, progress, due_date, created_at, updated_at";

/// Rows under a soft-deleted objective are invisible to everyone.
const BASE_FILTER: &str = "objective_id IN (SELECT id FROM objectives WHERE deleted_at IS NULL)";

fn validate_title(title: &str) -> Result<&str, ApiError> {
    let trimmed = title.trim();
    if trimmed.len() < 2 || trimmed.len() > 200 {
        return Err(ApiError::validation_error(
            "title must be between 2 and 200 characters",
            None,
        ));
    }
    Ok(trimmed)
}

fn validate_progress(progress: Option<i32>) -> Result<(), ApiError> {
    if let Some(progress) = progress {
        if !(0..=100).contains(&progress) {
            return Err(ApiError::validation_error(
                "progress must be between 0 and 100",
                None,
            ));
        }
    }
    Ok(())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

async fn fetch_visible(
    scope: &mut CompanyScope,
    profile: &Profile,
    id: Uuid,
) -> Result<Option<Initiative>, ApiError> {
    let mut builder = ListBuilder::new(format!(
        "SELECT {INITIATIVE_COLUMNS} FROM initiatives WHERE {BASE_FILTER}"
    ));
    builder.and_eq("id", SqlParam::Uuid(id))?;
    Visibility::for_profile(profile).apply_initiatives(&mut builder);
    Ok(builder.fetch_optional(scope.conn()).await?)
}

/// The parent objective's company, owner and department, if the caller can
/// see it. Children inherit the company from here, never from the client.
async fn visible_parent(
    scope: &mut CompanyScope,
    profile: &Profile,
    objective_id: Uuid,
) -> Result<Option<(Uuid, Option<Uuid>, Option<String>)>, ApiError> {
    let mut builder = ListBuilder::new(
        "SELECT company_id, owner_id, department FROM objectives WHERE deleted_at IS NULL",
    );
    builder.and_eq("id", SqlParam::Uuid(objective_id))?;
    Visibility::for_profile(profile).apply_objectives(&mut builder);
    Ok(builder.fetch_optional(scope.conn()).await?)
}

/// Department of an initiative for the mutation rule is its parent
/// objective's department.
async fn parent_department(
    scope: &mut CompanyScope,
    objective_id: Uuid,
) -> Result<Option<String>, ApiError> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT department FROM objectives WHERE id = $1")
            .bind(objective_id)
            .fetch_optional(scope.conn())
            .await?;
    Ok(row.and_then(|(department,)| department))
}

#[derive(Debug, Deserialize)]
pub struct InitiativeListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<InitiativeStatus>,
    pub owner_id: Option<Uuid>,
    pub objective_id: Option<Uuid>,
}

/// GET /api/initiatives - Visible initiatives, newest first
pub async fn list(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Query(query): Query<InitiativeListQuery>,
) -> ApiResult<Vec<Initiative>> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let mut builder = ListBuilder::new(format!(
        "SELECT {INITIATIVE_COLUMNS} FROM initiatives WHERE {BASE_FILTER}"
    ));
    Visibility::for_profile(&profile).apply_initiatives(&mut builder);
    if let Some(status) = query.status {
        builder.and_eq("status", SqlParam::Text(status.as_str().to_string()))?;
    }
    if let Some(owner_id) = query.owner_id {
        builder.and_eq("owner_id", SqlParam::Uuid(owner_id))?;
    }
    if let Some(objective_id) = query.objective_id {
        builder.and_eq("objective_id", SqlParam::Uuid(objective_id))?;
    }
    builder.order_by("created_at DESC");
    builder.paginate(Page::from_query(query.limit, query.offset));

    let initiatives: Vec<Initiative> = builder.fetch_all(scope.conn()).await?;
    Ok(ApiResponse::success(initiatives))
}

/// GET /api/initiatives/:id
pub async fn show(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<Initiative> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let initiative = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Initiative not found"))?;
    Ok(ApiResponse::success(initiative))
}

#[derive(Debug, Deserialize)]
pub struct CreateInitiativeRequest {
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// POST /api/initiatives - Create an initiative under a visible objective
pub async fn create(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<CreateInitiativeRequest>,
) -> ApiResult<Initiative> {
    let title = validate_title(&req.title)?.to_string();

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let (company_id, parent_owner, parent_dept) =
        visible_parent(&mut scope, &profile, req.objective_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Objective not found"))?;

    let owner_id = match req.owner_id {
        Some(owner) if owner != profile.id => {
            if !profile.can_modify_okr(parent_owner, parent_dept.as_deref()) {
                return Err(ApiError::forbidden(
                    "Only managers of this objective can assign initiatives to others",
                ));
            }
            owner
        }
        _ => profile.id,
    };

    let initiative: Initiative = sqlx::query_as(&format!(
        "INSERT INTO initiatives (company_id, objective_id, owner_id, title, description, due_date) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {INITIATIVE_COLUMNS}"
    ))
    .bind(company_id)
    .bind(req.objective_id)
    .bind(owner_id)
    .bind(&title)
    .bind(clean_description(req.description))
    .bind(req.due_date)
    .fetch_one(scope.conn())
    .await?;

    // A new initiative starts at 0 progress, which drags the objective mean.
    progress::recompute_for_objective(scope.conn(), req.objective_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::created(initiative))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInitiativeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<InitiativeStatus>,
    pub progress: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
}

/// PUT /api/initiatives/:id - Edit an initiative
///
/// Manual progress is honored for initiatives without activities; any
/// activity write recomputes it. The parent objective mean is refreshed
/// either way.
pub async fn update(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInitiativeRequest>,
) -> ApiResult<Initiative> {
    let title = match req.title.as_deref() {
        Some(raw) => Some(validate_title(raw)?.to_string()),
        None => None,
    };
    validate_progress(req.progress)?;

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let initiative = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Initiative not found"))?;
    let dept = parent_department(&mut scope, initiative.objective_id).await?;
    if !profile.can_modify_okr(initiative.owner_id, dept.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to edit this initiative",
        ));
    }

    let updated: Initiative = sqlx::query_as(&format!(
        "UPDATE initiatives SET \
         title = COALESCE($2, title), \
         description = COALESCE($3, description), \
         status = COALESCE($4, status), \
         progress = COALESCE($5, progress), \
         due_date = COALESCE($6, due_date), \
         owner_id = COALESCE($7, owner_id), \
         updated_at = now() \
         WHERE id = $1 RETURNING {INITIATIVE_COLUMNS}"
    ))
    .bind(initiative.id)
    .bind(title)
    .bind(clean_description(req.description))
    .bind(req.status)
    .bind(req.progress)
    .bind(req.due_date)
    .bind(req.owner_id)
    .fetch_one(scope.conn())
    .await?;

    progress::recompute_for_objective(scope.conn(), initiative.objective_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/initiatives/:id - Hard delete; activities cascade
pub async fn delete(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let initiative = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Initiative not found"))?;
    let dept = parent_department(&mut scope, initiative.objective_id).await?;
    if !profile.can_modify_okr(initiative.owner_id, dept.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to delete this initiative",
        ));
    }

    sqlx::query("DELETE FROM initiatives WHERE id = $1")
        .bind(initiative.id)
        .execute(scope.conn())
        .await?;

    progress::recompute_for_objective(scope.conn(), initiative.objective_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::no_content())
}
