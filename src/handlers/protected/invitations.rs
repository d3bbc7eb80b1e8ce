// handlers/protected/invitations.rs - Invitation management and acceptance

use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Invitation, Profile};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, CurrentProfile};
use crate::services::invitations::{
    CreateInvitationRequest, CreatedInvitation, InvitationService,
};

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
    pub full_name: String,
}

/// POST /api/invitations/accept - Join a company from an invitation link
///
/// Sits on the token-only tier: the caller has no profile yet, that is the
/// point of accepting.
pub async fn accept(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AcceptInvitationRequest>,
) -> ApiResult<Profile> {
    let service = InvitationService::new().await?;
    let profile = service.accept(&auth, &req.token, &req.full_name).await?;
    Ok(ApiResponse::created(profile))
}

/// GET /api/invitations - The company's invitations, newest first
pub async fn list(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
) -> ApiResult<Vec<Invitation>> {
    let service = InvitationService::new().await?;
    let invitations = service.list(&profile).await?;
    Ok(ApiResponse::success(invitations))
}

/// POST /api/invitations - Invite a member
///
/// The response carries the accept URL and whether the email went out;
/// delivery failure does not fail the request.
pub async fn create(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Json(req): Json<CreateInvitationRequest>,
) -> ApiResult<CreatedInvitation> {
    let service = InvitationService::new().await?;
    let created = service.create(&profile, req).await?;
    Ok(ApiResponse::created(created))
}

/// DELETE /api/invitations/:id - Revoke a pending invitation
pub async fn revoke(
    Extension(CurrentProfile(profile)): Extension<CurrentProfile>,
    Path(id): Path<Uuid>,
) -> ApiResult<Invitation> {
    let service = InvitationService::new().await?;
    let invitation = service.revoke(&profile, id).await?;
    Ok(ApiResponse::success(invitation))
}
