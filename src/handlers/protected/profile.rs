// handlers/protected/profile.rs - Own profile and company member management

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::list::{ListBuilder, Page, SqlParam};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Profile, RoleType};
use crate::database::scope::CompanyScope;
use crate::database::visibility::Visibility;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentProfile};

const PROFILE_COLUMNS: &str = "id, auth_user_id, company_id, email, full_name, role_type, \
     department, onboarding_completed, created_at, updated_at";

/// GET /api/profile - The caller's own profile
pub async fn show(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
) -> ApiResult<Profile> {
    Ok(ApiResponse::success(profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOwnProfileRequest {
    pub full_name: String,
}

/// PUT /api/profile - Rename yourself
///
/// Role and department changes go through PUT /api/profiles/:id so they
/// stay under management control.
pub async fn update(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<UpdateOwnProfileRequest>,
) -> ApiResult<Profile> {
    let full_name = req.full_name.trim();
    if full_name.len() < 2 || full_name.len() > 100 {
        return Err(ApiError::validation_error(
            "full_name must be between 2 and 100 characters",
            None,
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let updated: Profile = sqlx::query_as(&format!(
        "UPDATE profiles SET full_name = $2, updated_at = now() \
         WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(profile.id)
    .bind(full_name)
    .fetch_one(scope.conn())
    .await?;

    scope.commit().await?;
    Ok(ApiResponse::success(updated))
}

#[derive(Debug, Deserialize)]
pub struct ProfileListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub department: Option<String>,
    pub role_type: Option<RoleType>,
}

/// GET /api/profiles - Company members the caller can see
pub async fn list(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Query(query): Query<ProfileListQuery>,
) -> ApiResult<Vec<Profile>> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let mut builder = ListBuilder::new(format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE true"
    ));
    Visibility::for_profile(&profile).apply_profiles(&mut builder);
    if let Some(department) = query.department {
        builder.and_eq("department", SqlParam::Text(department))?;
    }
    if let Some(role_type) = query.role_type {
        builder.and_eq("role_type", SqlParam::Text(role_type.as_str().to_string()))?;
    }
    builder.order_by("full_name ASC");
    builder.paginate(Page::from_query(query.limit, query.offset));

    let profiles: Vec<Profile> = builder.fetch_all(scope.conn()).await?;
    Ok(ApiResponse::success(profiles))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub full_name: Option<String>,
    pub role_type: Option<RoleType>,
    pub department: Option<String>,
}

/// PUT /api/profiles/:id - Edit a member's role, department or name
///
/// Corporativo may edit anyone including roles; gerencial may edit
/// non-role fields inside their own department.
pub async fn update_member(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMemberRequest>,
) -> ApiResult<Profile> {
    if let Some(full_name) = req.full_name.as_deref() {
        let trimmed = full_name.trim();
        if trimmed.len() < 2 || trimmed.len() > 100 {
            return Err(ApiError::validation_error(
                "full_name must be between 2 and 100 characters",
                None,
            ));
        }
    }

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let target: Profile = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(scope.conn())
    .await?
    .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    let changes_role = req
        .role_type
        .map(|role| role != target.role_type)
        .unwrap_or(false);
    if !profile.can_manage(&target, changes_role) {
        return Err(ApiError::forbidden(
            "You are not allowed to edit this profile",
        ));
    }

    let updated: Profile = sqlx::query_as(&format!(
        "UPDATE profiles SET \
         full_name = COALESCE($2, full_name), \
         role_type = COALESCE($3, role_type), \
         department = COALESCE($4, department), \
         updated_at = now() \
         WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(target.id)
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(req.role_type)
    .bind(req.department)
    .fetch_one(scope.conn())
    .await?;

    scope.commit().await?;
    Ok(ApiResponse::success(updated))
}
