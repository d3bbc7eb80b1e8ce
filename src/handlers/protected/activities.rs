// handlers/protected/activities.rs - /api/activities CRUD + status flips

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::list::{ListBuilder, Page, SqlParam};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Activity, ActivityStatus, Profile};
use crate::database::scope::CompanyScope;
use crate::database::visibility::Visibility;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentProfile};
use crate::services::progress;

const ACTIVITY_COLUMNS: &str = "id, company_id, initiative_id, owner_id, title, status, \
     due_date, completed_at, created_at, updated_at";

/// Rows whose objective is soft-deleted are invisible to everyone.
const BASE_FILTER: &str = "initiative_id IN (SELECT i.id FROM initiatives i \
     JOIN objectives o ON o.id = i.objective_id WHERE o.deleted_at IS NULL)";

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

async fn fetch_visible(
    scope: &mut CompanyScope,
    profile: &Profile,
    id: Uuid,
) -> Result<Option<Activity>, ApiError> {
    let mut builder = ListBuilder::new(format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE {BASE_FILTER}"
    ));
    builder.and_eq("id", SqlParam::Uuid(id))?;
    Visibility::for_profile(profile).apply_activities(&mut builder);
    Ok(builder.fetch_optional(scope.conn()).await?)
}

/// Company and objective department of a visible parent initiative.
async fn visible_parent(
    scope: &mut CompanyScope,
    profile: &Profile,
    initiative_id: Uuid,
) -> Result<Option<(Uuid, Option<Uuid>, Option<String>)>, ApiError> {
    let mut builder = ListBuilder::new(
        "SELECT company_id, owner_id, \
         (SELECT department FROM objectives WHERE id = initiatives.objective_id) \
         FROM initiatives \
         WHERE objective_id IN (SELECT id FROM objectives WHERE deleted_at IS NULL)",
    );
    builder.and_eq("id", SqlParam::Uuid(initiative_id))?;
    Visibility::for_profile(profile).apply_initiatives(&mut builder);
    Ok(builder.fetch_optional(scope.conn()).await?)
}

/// The mutation rule for an activity uses the parent objective's department.
async fn objective_department(
    scope: &mut CompanyScope,
    initiative_id: Uuid,
) -> Result<Option<String>, ApiError> {
    let row: Option<(Option<String>,)> = sqlx::query_as(
        "SELECT o.department FROM initiatives i \
         JOIN objectives o ON o.id = i.objective_id WHERE i.id = $1",
    )
    .bind(initiative_id)
    .fetch_optional(scope.conn())
    .await?;
    Ok(row.and_then(|(department,)| department))
}

#[derive(Debug, Deserialize)]
pub struct ActivityListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<ActivityStatus>,
    pub owner_id: Option<Uuid>,
    pub initiative_id: Option<Uuid>,
}

/// GET /api/activities - Visible activities, newest first
pub async fn list(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Query(query): Query<ActivityListQuery>,
) -> ApiResult<Vec<Activity>> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let mut builder = ListBuilder::new(format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE {BASE_FILTER}"
    ));
    Visibility::for_profile(&profile).apply_activities(&mut builder);
    if let Some(status) = query.status {
        builder.and_eq("status", SqlParam::Text(status.as_str().to_string()))?;
    }
    if let Some(owner_id) = query.owner_id {
        builder.and_eq("owner_id", SqlParam::Uuid(owner_id))?;
    }
    if let Some(initiative_id) = query.initiative_id {
        builder.and_eq("initiative_id", SqlParam::Uuid(initiative_id))?;
    }
    builder.order_by("created_at DESC");
    builder.paginate(Page::from_query(query.limit, query.offset));

    let activities: Vec<Activity> = builder.fetch_all(scope.conn()).await?;
    Ok(ApiResponse::success(activities))
}

/// GET /api/activities/:id
pub async fn show(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<Activity> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let activity = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity not found"))?;
    Ok(ApiResponse::success(activity))
}

#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    pub initiative_id: Uuid,
    pub title: String,
    pub owner_id: Option<Uuid>,
    pub status: Option<ActivityStatus>,
    pub due_date: Option<NaiveDate>,
}

/// POST /api/activities - Create an activity under a visible initiative
pub async fn create(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<CreateActivityRequest>,
) -> ApiResult<Activity> {
    let title = validate_title(&req.title)?.to_string();

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let (company_id, parent_owner, parent_dept) =
        visible_parent(&mut scope, &profile, req.initiative_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Initiative not found"))?;

    let owner_id = match req.owner_id {
        Some(owner) if owner != profile.id => {
            if !profile.can_modify_okr(parent_owner, parent_dept.as_deref()) {
                return Err(ApiError::forbidden(
                    "Only managers of this initiative can assign activities to others",
                ));
            }
            owner
        }
        _ => profile.id,
    };

    let status = req.status.unwrap_or(ActivityStatus::Todo);
    let completed_at = matches!(status, ActivityStatus::Done).then(Utc::now);

    let activity: Activity = sqlx::query_as(&format!(
        "INSERT INTO activities (company_id, initiative_id, owner_id, title, status, due_date, completed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ACTIVITY_COLUMNS}"
    ))
    .bind(company_id)
    .bind(req.initiative_id)
    .bind(owner_id)
    .bind(&title)
    .bind(status)
    .bind(req.due_date)
    .bind(completed_at)
    .fetch_one(scope.conn())
    .await?;

    progress::recompute_for_initiative(scope.conn(), req.initiative_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::created(activity))
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    pub title: Option<String>,
    pub status: Option<ActivityStatus>,
    pub due_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
}

/// PUT /api/activities/:id - Edit an activity
pub async fn update(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateActivityRequest>,
) -> ApiResult<Activity> {
    let title = match req.title.as_deref() {
        Some(raw) => Some(validate_title(raw)?.to_string()),
        None => None,
    };

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let activity = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity not found"))?;
    let dept = objective_department(&mut scope, activity.initiative_id).await?;
    if !profile.can_modify_okr(activity.owner_id, dept.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to edit this activity",
        ));
    }

    let updated = apply_update(
        &mut scope,
        activity.id,
        title.as_deref(),
        req.status,
        req.due_date,
        req.owner_id,
    )
    .await?;

    progress::recompute_for_initiative(scope.conn(), activity.initiative_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::success(updated))
}

#[derive(Debug, Deserialize)]
pub struct PatchActivityStatusRequest {
    pub status: ActivityStatus,
}

/// PATCH /api/activities/:id - Flip just the status (the kanban move)
pub async fn patch_status(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchActivityStatusRequest>,
) -> ApiResult<Activity> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let activity = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity not found"))?;
    let dept = objective_department(&mut scope, activity.initiative_id).await?;
    if !profile.can_modify_okr(activity.owner_id, dept.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to edit this activity",
        ));
    }

    let updated = apply_update(&mut scope, activity.id, None, Some(req.status), None, None).await?;

    progress::recompute_for_initiative(scope.conn(), activity.initiative_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/activities/:id - Hard delete
pub async fn delete(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let activity = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity not found"))?;
    let dept = objective_department(&mut scope, activity.initiative_id).await?;
    if !profile.can_modify_okr(activity.owner_id, dept.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to delete this activity",
        ));
    }

    sqlx::query("DELETE FROM activities WHERE id = $1")
        .bind(activity.id)
        .execute(scope.conn())
        .await?;

    progress::recompute_for_initiative(scope.conn(), activity.initiative_id).await?;

    scope.commit().await?;
    Ok(ApiResponse::no_content())
}

/// Shared UPDATE for PUT and PATCH. `completed_at` follows the status: set
/// when a row lands on done, kept if already done, cleared otherwise.
async fn apply_update(
    scope: &mut CompanyScope,
    id: Uuid,
    title: Option<&str>,
    status: Option<ActivityStatus>,
    due_date: Option<NaiveDate>,
    owner_id: Option<Uuid>,
) -> Result<Activity, ApiError> {
    let updated: Activity = sqlx::query_as(&format!(
        "UPDATE activities SET \
         title = COALESCE($2, title), \
         status = COALESCE($3, status), \
         due_date = COALESCE($4, due_date), \
         owner_id = COALESCE($5, owner_id), \
         completed_at = CASE \
             WHEN COALESCE($3, status) = 'done' THEN COALESCE(completed_at, now()) \
             ELSE NULL \
         END, \
         updated_at = now() \
         WHERE id = $1 RETURNING {ACTIVITY_COLUMNS}"
    ))
    .bind(id)
    .bind(title)
    .bind(status)
    .bind(due_date)
    .bind(owner_id)
    .fetch_one(scope.conn())
    .await?;
    Ok(updated)
}
