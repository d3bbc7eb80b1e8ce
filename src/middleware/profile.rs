use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use crate::database::models::Profile;
use crate::database::{CompanyScope, DatabaseManager};
use crate::error::ApiError;

/// The caller's resolved profile: company, role, department. Injected by
/// `load_profile_middleware` on every tenant route.
#[derive(Clone, Debug)]
pub struct CurrentProfile(pub Profile);

/// Middleware that resolves the authenticated user's profile once per
/// request. Routes behind it can assume a company context exists; callers
/// without a profile are told to finish onboarding instead of getting
/// scattered 500s further in.
pub async fn load_profile_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before profile lookup"))?;

    let pool = DatabaseManager::pool().await?;

    // Bootstrap scope: only the caller's own profile row is visible here.
    let mut scope = CompanyScope::for_auth_user(&pool, auth_user.user_id).await?;

    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, auth_user_id, company_id, email, full_name, role_type, \
         department, onboarding_completed, created_at, updated_at \
         FROM profiles WHERE auth_user_id = $1",
    )
    .bind(auth_user.user_id)
    .fetch_optional(scope.conn())
    .await
    .map_err(|e| {
        tracing::error!("Profile lookup failed for {}: {}", auth_user.user_id, e);
        ApiError::internal_server_error("Failed to resolve profile")
    })?;

    let profile = profile.ok_or_else(|| {
        ApiError::forbidden("No profile for this user; complete onboarding or accept an invitation")
    })?;

    tracing::debug!(
        "Resolved profile {} ({}) in company {}",
        profile.id,
        profile.role_type,
        profile.company_id
    );

    request.extensions_mut().insert(CurrentProfile(profile));

    Ok(next.run(request).await)
}
