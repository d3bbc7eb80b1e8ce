// handlers/protected/objectives.rs - /api/objectives CRUD

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::list::{ListBuilder, Page, SqlParam};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Objective, ObjectiveStatus, Profile, RoleType};
use crate::database::scope::CompanyScope;
use crate::database::visibility::Visibility;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentProfile};

const OBJECTIVE_COLUMNS: &str = "id, company_id, owner_id, department, title, description, \
     status, progress, quarter, year, created_at, updated_at, deleted_at";

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

fn validate_period(quarter: Option<i32>, year: Option<i32>) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    if let Some(quarter) = quarter {
        if !(1..=4).contains(&quarter) {
            field_errors.insert("quarter".to_string(), "must be between 1 and 4".to_string());
        }
    }
    if let Some(year) = year {
        if !(2000..=2100).contains(&year) {
            field_errors.insert("year".to_string(), "must be a four-digit year".to_string());
        }
    }
    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error(
            "Invalid objective period",
            Some(field_errors),
        ))
    }
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Single-row read through the same predicate as the list, so an invisible
/// objective and a missing one are indistinguishable (404).
async fn fetch_visible(
    scope: &mut CompanyScope,
    profile: &Profile,
    id: Uuid,
) -> Result<Option<Objective>, ApiError> {
    let mut builder = ListBuilder::new(format!(
        "SELECT {OBJECTIVE_COLUMNS} FROM objectives WHERE deleted_at IS NULL"
    ));
    builder.and_eq("id", SqlParam::Uuid(id))?;
    Visibility::for_profile(profile).apply_objectives(&mut builder);
    Ok(builder.fetch_optional(scope.conn()).await?)
}

#[derive(Debug, Deserialize)]
pub struct ObjectiveListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<ObjectiveStatus>,
    pub department: Option<String>,
    pub owner_id: Option<Uuid>,
    pub quarter: Option<i32>,
    pub year: Option<i32>,
}

/// GET /api/objectives - Visible objectives, newest period first
pub async fn list(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Query(query): Query<ObjectiveListQuery>,
) -> ApiResult<Vec<Objective>> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let mut builder = ListBuilder::new(format!(
        "SELECT {OBJECTIVE_COLUMNS} FROM objectives WHERE deleted_at IS NULL"
    ));
    Visibility::for_profile(&profile).apply_objectives(&mut builder);
    if let Some(status) = query.status {
        builder.and_eq("status", SqlParam::Text(status.as_str().to_string()))?;
    }
    if let Some(department) = query.department {
        builder.and_eq("department", SqlParam::Text(department))?;
    }
    if let Some(owner_id) = query.owner_id {
        builder.and_eq("owner_id", SqlParam::Uuid(owner_id))?;
    }
    if let Some(quarter) = query.quarter {
        builder.and_eq("quarter", SqlParam::Int(quarter as i64))?;
    }
    if let Some(year) = query.year {
        builder.and_eq("year", SqlParam::Int(year as i64))?;
    }
    builder.order_by("year DESC, quarter DESC, created_at DESC");
    builder.paginate(Page::from_query(query.limit, query.offset));

    let objectives: Vec<Objective> = builder.fetch_all(scope.conn()).await?;
    Ok(ApiResponse::success(objectives))
}

/// GET /api/objectives/:id
pub async fn show(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<Objective> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let objective = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Objective not found"))?;
    Ok(ApiResponse::success(objective))
}

#[derive(Debug, Deserialize)]
pub struct CreateObjectiveRequest {
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub owner_id: Option<Uuid>,
    pub quarter: i32,
    pub year: i32,
}

/// POST /api/objectives - Create an objective
///
/// company_id always comes from the caller's profile. Non-corporativo
/// callers create objectives they own, pinned to their own department.
pub async fn create(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<CreateObjectiveRequest>,
) -> ApiResult<Objective> {
    let title = validate_title(&req.title)?.to_string();
    validate_period(Some(req.quarter), Some(req.year))?;

    let owner_id = match req.owner_id {
        Some(owner) if owner != profile.id => {
            if profile.role_type != RoleType::Corporativo {
                return Err(ApiError::forbidden(
                    "Only corporativo members can assign objectives to others",
                ));
            }
            owner
        }
        _ => profile.id,
    };
    let department = match profile.role_type {
        RoleType::Corporativo => req.department.or_else(|| profile.department.clone()),
        _ => profile.department.clone(),
    };

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let objective: Objective = sqlx::query_as(&format!(
        "INSERT INTO objectives (company_id, owner_id, department, title, description, quarter, year) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {OBJECTIVE_COLUMNS}"
    ))
    .bind(profile.company_id)
    .bind(owner_id)
    .bind(&department)
    .bind(&title)
    .bind(clean_description(req.description))
    .bind(req.quarter)
    .bind(req.year)
    .fetch_one(scope.conn())
    .await?;

    scope.commit().await?;
    Ok(ApiResponse::created(objective))
}

#[derive(Debug, Deserialize)]
pub struct UpdateObjectiveRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ObjectiveStatus>,
    pub department: Option<String>,
    pub owner_id: Option<Uuid>,
    pub quarter: Option<i32>,
    pub year: Option<i32>,
}

/// PUT /api/objectives/:id - Edit an objective
///
/// Omitted fields keep their value. Progress is not editable here; it is
/// recomputed from initiatives.
pub async fn update(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateObjectiveRequest>,
) -> ApiResult<Objective> {
    let title = match req.title.as_deref() {
        Some(raw) => Some(validate_title(raw)?.to_string()),
        None => None,
    };
    validate_period(req.quarter, req.year)?;

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let objective = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Objective not found"))?;
    if !profile.can_modify_okr(objective.owner_id, objective.department.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to edit this objective",
        ));
    }

    let updated: Objective = sqlx::query_as(&format!(
        "UPDATE objectives SET \
         title = COALESCE($2, title), \
         description = COALESCE($3, description), \
         status = COALESCE($4, status), \
         department = COALESCE($5, department), \
         owner_id = COALESCE($6, owner_id), \
         quarter = COALESCE($7, quarter), \
         year = COALESCE($8, year), \
         updated_at = now() \
         WHERE id = $1 AND deleted_at IS NULL RETURNING {OBJECTIVE_COLUMNS}"
    ))
    .bind(objective.id)
    .bind(title)
    .bind(clean_description(req.description))
    .bind(req.status)
    .bind(req.department)
    .bind(req.owner_id)
    .bind(req.quarter)
    .bind(req.year)
    .fetch_optional(scope.conn())
    .await?
    .ok_or_else(|| ApiError::not_found("Objective not found"))?;

    scope.commit().await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/objectives/:id - Soft delete
///
/// Sets deleted_at; the row and everything under it disappear from reads
/// but stay in the database.
pub async fn delete(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let objective = fetch_visible(&mut scope, &profile, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Objective not found"))?;
    if !profile.can_modify_okr(objective.owner_id, objective.department.as_deref()) {
        return Err(ApiError::forbidden(
            "You are not allowed to delete this objective",
        ));
    }

    sqlx::query(
        "UPDATE objectives SET deleted_at = now(), updated_at = now() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(objective.id)
    .execute(scope.conn())
    .await?;

    scope.commit().await?;
    Ok(ApiResponse::no_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_trimmed_and_length_checked() {
        assert_eq!(validate_title("  Grow revenue  ").unwrap(), "Grow revenue");
        assert!(validate_title("x").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn period_bounds_report_per_field_errors() {
        assert!(validate_period(Some(1), Some(2025)).is_ok());
        assert!(validate_period(None, None).is_ok());

        let err = validate_period(Some(5), Some(1999)).unwrap_err();
        match err {
            ApiError::ValidationError {
                field_errors: Some(fields),
                ..
            } => {
                assert!(fields.contains_key("quarter"));
                assert!(fields.contains_key("year"));
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_descriptions_become_null() {
        assert_eq!(clean_description(Some("  ".to_string())), None);
        assert_eq!(
            clean_description(Some("  ship it  ".to_string())),
            Some("ship it".to_string())
        );
        assert_eq!(clean_description(None), None);
    }
}
