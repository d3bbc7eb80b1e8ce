// handlers/protected/onboarding.rs - POST /api/onboarding/company

use axum::{Extension, Json};
use serde::Serialize;

use crate::database::models::{Company, Profile};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::onboarding::{CreateCompanyRequest, OnboardingService};

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub company: Company,
    pub profile: Profile,
}

/// POST /api/onboarding/company - First-user flow
///
/// Creates the company and its corporativo profile in one transaction.
/// 409 when the caller already belongs to a company.
pub async fn create_company(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateCompanyRequest>,
) -> ApiResult<OnboardingResponse> {
    let service = OnboardingService::new().await?;
    let (company, profile) = service.create_company(&auth, req).await?;
    Ok(ApiResponse::created(OnboardingResponse { company, profile }))
}
