// handlers/protected/company.rs - GET/PUT /api/company

use axum::{Extension, Json};
use serde::Deserialize;

use crate::database::manager::DatabaseManager;
use crate::database::models::Company;
use crate::database::scope::CompanyScope;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentProfile};

/// GET /api/company - The caller's company record
pub async fn show(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
) -> ApiResult<Company> {
    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let company: Company = sqlx::query_as(
        "SELECT id, name, created_at, updated_at FROM companies WHERE id = $1",
    )
    .bind(profile.company_id)
    .fetch_one(scope.conn())
    .await?;

    Ok(ApiResponse::success(company))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: String,
}

/// PUT /api/company - Rename the company (corporativo only)
pub async fn update(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<UpdateCompanyRequest>,
) -> ApiResult<Company> {
    if !profile.role_type.can_edit_company() {
        return Err(ApiError::forbidden(
            "Only corporativo members can edit the company",
        ));
    }
    let name = req.name.trim();
    if name.len() < 2 || name.len() > 100 {
        return Err(ApiError::validation_error(
            "name must be between 2 and 100 characters",
            None,
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let mut scope =
        CompanyScope::for_company(&pool, profile.auth_user_id, profile.company_id).await?;

    let company: Company = sqlx::query_as(
        "UPDATE companies SET name = $2, updated_at = now() \
         WHERE id = $1 RETURNING id, name, created_at, updated_at",
    )
    .bind(profile.company_id)
    .bind(name)
    .fetch_one(scope.conn())
    .await?;

    scope.commit().await?;
    Ok(ApiResponse::success(company))
}
