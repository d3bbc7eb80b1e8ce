use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Invitation, InvitationStatus, Profile, RoleType};
use crate::database::scope::CompanyScope;
use crate::email::EmailClient;
use crate::middleware::auth::AuthUser;

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("Invitation not found")]
    NotFound,
    #[error("Invitation is no longer pending: {0}")]
    NotPending(String),
    #[error("Invitation has expired")]
    Expired,
    #[error("User already belongs to a company")]
    AlreadyMember,
    #[error("Not permitted: {0}")]
    NotPermitted(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for InvitationError {
    fn from(e: sqlx::Error) -> Self {
        InvitationError::Database(DatabaseError::Sqlx(e))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role_type: RoleType,
    pub department: Option<String>,
}

/// What the inviter gets back. The accept URL embeds the raw token; it is
/// shown exactly once, here and in the invitation email.
#[derive(Debug, Serialize)]
pub struct CreatedInvitation {
    pub invitation: Invitation,
    pub accept_url: String,
    pub email_sent: bool,
}

/// Public, unauthenticated view of an invitation.
#[derive(Debug, Serialize)]
pub struct InvitationPreview {
    pub company_name: String,
    pub email: String,
    pub role_type: RoleType,
    pub department: Option<String>,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
}

pub struct InvitationService {
    pool: PgPool,
}

impl InvitationService {
    pub async fn new() -> Result<Self, InvitationError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Create an invitation and send the acceptance link by email.
    /// Email delivery is best effort; the invitation exists either way.
    pub async fn create(
        &self,
        inviter: &Profile,
        req: CreateInvitationRequest,
    ) -> Result<CreatedInvitation, InvitationError> {
        let email = normalize_email(&req.email)?;

        if !inviter.role_type.can_invite() {
            return Err(InvitationError::NotPermitted(
                "Only corporativo and gerencial roles can invite".to_string(),
            ));
        }
        if !inviter.role_type.can_grant(req.role_type) {
            return Err(InvitationError::NotPermitted(format!(
                "Role {} cannot grant {}",
                inviter.role_type, req.role_type
            )));
        }

        // Managers bring people into their own department, full stop.
        let department = match inviter.role_type {
            RoleType::Gerencial => inviter.department.clone(),
            _ => req.department.clone(),
        };

        let mut scope =
            CompanyScope::for_company(&self.pool, inviter.auth_user_id, inviter.company_id).await?;

        let already_member: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM profiles WHERE lower(email) = lower($1)")
                .bind(&email)
                .fetch_optional(scope.conn())
                .await?;
        if already_member.is_some() {
            return Err(InvitationError::AlreadyMember);
        }

        let pending_exists: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM invitations WHERE lower(email) = lower($1) AND status = 'pending'",
        )
        .bind(&email)
        .fetch_optional(scope.conn())
        .await?;
        if pending_exists.is_some() {
            return Err(InvitationError::NotPermitted(
                "A pending invitation for this email already exists".to_string(),
            ));
        }

        let raw_token = generate_raw_token();
        let token_hash = hash_token(&raw_token);
        let expires_at =
            Utc::now() + Duration::days(config::config().security.invitation_expiry_days);

        let invitation = sqlx::query_as::<_, Invitation>(
            "INSERT INTO invitations \
             (company_id, email, role_type, department, token_hash, status, invited_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7) \
             RETURNING id, company_id, email, role_type, department, token_hash, status, \
                       invited_by, expires_at, accepted_at, created_at",
        )
        .bind(inviter.company_id)
        .bind(&email)
        .bind(req.role_type)
        .bind(&department)
        .bind(&token_hash)
        .bind(inviter.id)
        .bind(expires_at)
        .fetch_one(scope.conn())
        .await?;

        let company_name: (String,) = sqlx::query_as("SELECT name FROM companies WHERE id = $1")
            .bind(inviter.company_id)
            .fetch_one(scope.conn())
            .await?;

        scope.commit().await?;

        let accept_url = accept_url(&raw_token);

        // Delivery happens after commit so a slow or failing provider can
        // never roll back the invitation.
        let email_sent = match EmailClient::from_config() {
            Some(client) => client
                .send_invitation(&email, &company_name.0, &inviter.full_name, &accept_url)
                .await
                .map(|_| true)
                .unwrap_or_else(|e| {
                    tracing::warn!("Invitation email to {} failed: {}", email, e);
                    false
                }),
            None => false,
        };

        Ok(CreatedInvitation {
            invitation,
            accept_url,
            email_sent,
        })
    }

    /// List the company's invitations, newest first.
    pub async fn list(&self, caller: &Profile) -> Result<Vec<Invitation>, InvitationError> {
        if !caller.role_type.can_invite() {
            return Err(InvitationError::NotPermitted(
                "Only corporativo and gerencial roles can view invitations".to_string(),
            ));
        }

        let mut scope =
            CompanyScope::for_company(&self.pool, caller.auth_user_id, caller.company_id).await?;

        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT id, company_id, email, role_type, department, token_hash, status, \
             invited_by, expires_at, accepted_at, created_at \
             FROM invitations ORDER BY created_at DESC",
        )
        .fetch_all(scope.conn())
        .await?;

        Ok(invitations)
    }

    /// Revoke a pending invitation. Corporativo can revoke any; gerencial
    /// only ones they sent.
    pub async fn revoke(&self, caller: &Profile, id: Uuid) -> Result<Invitation, InvitationError> {
        if !caller.role_type.can_invite() {
            return Err(InvitationError::NotPermitted(
                "Only corporativo and gerencial roles can revoke invitations".to_string(),
            ));
        }

        let mut scope =
            CompanyScope::for_company(&self.pool, caller.auth_user_id, caller.company_id).await?;

        let invitation = fetch_invitation_by_id(&mut scope, id)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if caller.role_type == RoleType::Gerencial && invitation.invited_by != Some(caller.id) {
            return Err(InvitationError::NotPermitted(
                "Gerencial can only revoke invitations they created".to_string(),
            ));
        }

        let revoked = sqlx::query_as::<_, Invitation>(
            "UPDATE invitations SET status = 'revoked' \
             WHERE id = $1 AND status = 'pending' \
             RETURNING id, company_id, email, role_type, department, token_hash, status, \
                       invited_by, expires_at, accepted_at, created_at",
        )
        .bind(id)
        .fetch_optional(scope.conn())
        .await?
        .ok_or_else(|| InvitationError::NotPending(invitation.status.to_string()))?;

        scope.commit().await?;
        Ok(revoked)
    }

    /// Anonymous preview by raw token. Read-only: an expired-but-pending
    /// invitation reports `expired` without flipping the row.
    pub async fn preview(&self, raw_token: &str) -> Result<InvitationPreview, InvitationError> {
        let token_hash = hash_token(raw_token);
        let mut scope = CompanyScope::for_invitation_token(&self.pool, &token_hash).await?;

        let row: Option<(String, String, RoleType, Option<String>, InvitationStatus, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT c.name, i.email, i.role_type, i.department, i.status, i.expires_at \
                 FROM invitations i JOIN companies c ON c.id = i.company_id \
                 WHERE i.token_hash = $1",
            )
            .bind(&token_hash)
            .fetch_optional(scope.conn())
            .await?;

        let (company_name, email, role_type, department, mut status, expires_at) =
            row.ok_or(InvitationError::NotFound)?;

        if status == InvitationStatus::Pending && expires_at < Utc::now() {
            status = InvitationStatus::Expired;
        }

        Ok(InvitationPreview {
            company_name,
            email,
            role_type,
            department,
            status,
            expires_at,
        })
    }

    /// Accept an invitation as the authenticated identity-provider user.
    ///
    /// Runs the whole flow in one scope transaction: token lookup, state
    /// checks, profile creation with a race guard, permission grant, and a
    /// compare-and-set on the invitation status so two concurrent accepts
    /// cannot both win.
    pub async fn accept(
        &self,
        auth: &AuthUser,
        raw_token: &str,
        full_name: &str,
    ) -> Result<Profile, InvitationError> {
        let full_name = full_name.trim();
        if full_name.len() < 2 || full_name.len() > 100 {
            return Err(InvitationError::InvalidInput(
                "full_name must be between 2 and 100 characters".to_string(),
            ));
        }

        let token_hash = hash_token(raw_token);

        let mut scope = CompanyScope::for_auth_user(&self.pool, auth.user_id).await?;
        scope.set_invitation_token(&token_hash).await?;

        let invitation = sqlx::query_as::<_, Invitation>(
            "SELECT id, company_id, email, role_type, department, token_hash, status, \
             invited_by, expires_at, accepted_at, created_at \
             FROM invitations WHERE token_hash = $1",
        )
        .bind(&token_hash)
        .fetch_optional(scope.conn())
        .await?
        .ok_or(InvitationError::NotFound)?;

        match invitation.status {
            InvitationStatus::Pending => {}
            other => return Err(InvitationError::NotPending(other.to_string())),
        }

        if invitation.expires_at < Utc::now() {
            // Flip and persist the expiry before reporting it.
            sqlx::query("UPDATE invitations SET status = 'expired' WHERE id = $1 AND status = 'pending'")
                .bind(invitation.id)
                .execute(scope.conn())
                .await?;
            scope.commit().await?;
            return Err(InvitationError::Expired);
        }

        if !invitation.email.eq_ignore_ascii_case(&auth.email) {
            return Err(InvitationError::NotPermitted(
                "Invitation was issued for a different email address".to_string(),
            ));
        }

        scope.set_company(invitation.company_id).await?;

        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles \
             (auth_user_id, company_id, email, full_name, role_type, department, onboarding_completed) \
             VALUES ($1, $2, $3, $4, $5, $6, true) \
             ON CONFLICT (auth_user_id) DO NOTHING \
             RETURNING id, auth_user_id, company_id, email, full_name, role_type, \
                       department, onboarding_completed, created_at, updated_at",
        )
        .bind(auth.user_id)
        .bind(invitation.company_id)
        .bind(&invitation.email)
        .bind(full_name)
        .bind(invitation.role_type)
        .bind(&invitation.department)
        .fetch_optional(scope.conn())
        .await?;

        // Lost the insert race, or the user already joined some company.
        let profile = profile.ok_or(InvitationError::AlreadyMember)?;

        sqlx::query(
            "INSERT INTO profile_permissions (profile_id, permission) VALUES ($1, 'okr_member')",
        )
        .bind(profile.id)
        .execute(scope.conn())
        .await?;

        let claimed =
            sqlx::query("UPDATE invitations SET status = 'accepted', accepted_at = now() \
                         WHERE id = $1 AND status = 'pending'")
                .bind(invitation.id)
                .execute(scope.conn())
                .await?;

        if claimed.rows_affected() == 0 {
            // Someone else accepted between our read and this write. The
            // scope drops here and rolls the profile insert back.
            return Err(InvitationError::NotPending("accepted".to_string()));
        }

        scope.commit().await?;

        tracing::info!(
            "Invitation {} accepted; profile {} joined company {}",
            invitation.id,
            profile.id,
            profile.company_id
        );

        Ok(profile)
    }
}

async fn fetch_invitation_by_id(
    scope: &mut CompanyScope,
    id: Uuid,
) -> Result<Option<Invitation>, InvitationError> {
    let invitation = sqlx::query_as::<_, Invitation>(
        "SELECT id, company_id, email, role_type, department, token_hash, status, \
         invited_by, expires_at, accepted_at, created_at \
         FROM invitations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(scope.conn())
    .await?;
    Ok(invitation)
}

/// Raw invitation token: two v4 UUIDs, hex only, 64 chars. Never stored.
pub fn generate_raw_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Stable sha-256 hex digest of a raw token. This is the only form that
/// touches the database.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn accept_url(raw_token: &str) -> String {
    let base = config::config().email.invite_link_base.trim_end_matches('/');
    format!("{}/{}", base, raw_token)
}

fn normalize_email(email: &str) -> Result<String, InvitationError> {
    let email = email.trim().to_lowercase();
    if email.len() < 3 || email.len() > 255 || !email.contains('@') || email.contains(char::is_whitespace) {
        return Err(InvitationError::InvalidInput(
            "A valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tokens_are_64_hex_chars_and_unique() {
        let a = generate_raw_token();
        let b = generate_raw_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn token_hash_is_stable_and_distinct_from_raw() {
        let raw = generate_raw_token();
        let h1 = hash_token(&raw);
        let h2 = hash_token(&raw);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, raw);
    }

    #[test]
    fn different_tokens_hash_differently() {
        assert_ne!(hash_token("aaa"), hash_token("aab"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(
            normalize_email("  Person@Example.COM ").unwrap(),
            "person@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@").is_err());
        assert!(normalize_email("has space@example.com").is_err());
    }
}
