// handlers/public/invitations.rs - GET /invitations/:token

use axum::extract::Path;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::invitations::{InvitationPreview, InvitationService};

/// GET /invitations/:token - Preview an invitation before signing in
///
/// Shows the invitee which company and role the link is for. Read-only:
/// an expired invitation is reported as expired but not flipped here.
pub async fn preview(Path(token): Path<String>) -> ApiResult<InvitationPreview> {
    let service = InvitationService::new().await?;
    let preview = service.preview(&token).await?;
    Ok(ApiResponse::success(preview))
}
