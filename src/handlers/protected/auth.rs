// handlers/protected/auth.rs - GET /api/auth/whoami

use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::Profile;
use crate::database::scope::CompanyScope;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: Uuid,
    pub email: String,
    pub profile: Option<Profile>,
    pub permissions: Vec<String>,
    pub onboarded: bool,
}

/// GET /api/auth/whoami - Identity behind the presented token
///
/// Works before onboarding: `profile` stays null until the user creates a
/// company or accepts an invitation, which is how the frontend decides
/// whether to show the onboarding flow.
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> ApiResult<WhoamiResponse> {
    let pool = DatabaseManager::pool().await?;
    let mut scope = CompanyScope::for_auth_user(&pool, auth.user_id).await?;

    let profile: Option<Profile> = sqlx::query_as(
        "SELECT id, auth_user_id, company_id, email, full_name, role_type, department, \
         onboarding_completed, created_at, updated_at \
         FROM profiles WHERE auth_user_id = $1",
    )
    .bind(auth.user_id)
    .fetch_optional(scope.conn())
    .await?;

    let permissions: Vec<String> = match &profile {
        Some(profile) => {
            sqlx::query_scalar(
                "SELECT permission FROM profile_permissions \
                 WHERE profile_id = $1 ORDER BY granted_at",
            )
            .bind(profile.id)
            .fetch_all(scope.conn())
            .await?
        }
        None => Vec::new(),
    };

    let onboarded = profile
        .as_ref()
        .map(|p| p.onboarding_completed)
        .unwrap_or(false);

    Ok(ApiResponse::success(WhoamiResponse {
        user_id: auth.user_id,
        email: auth.email,
        profile,
        permissions,
        onboarded,
    }))
}
