use serde::Deserialize;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Company, Profile};
use crate::database::scope::CompanyScope;
use crate::middleware::auth::AuthUser;

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("User already belongs to a company")]
    ProfileExists,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for OnboardingError {
    fn from(e: sqlx::Error) -> Self {
        OnboardingError::Database(DatabaseError::Sqlx(e))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub company_name: String,
    pub full_name: String,
    pub department: Option<String>,
}

pub struct OnboardingService {
    pool: PgPool,
}

impl OnboardingService {
    pub async fn new() -> Result<Self, OnboardingError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// First-user flow: create a company and its corporativo profile in one
    /// transaction. A lost race on the profile insert rolls the company
    /// back too.
    pub async fn create_company(
        &self,
        auth: &AuthUser,
        req: CreateCompanyRequest,
    ) -> Result<(Company, Profile), OnboardingError> {
        let company_name = validate_name(&req.company_name, "company_name")?;
        let full_name = validate_name(&req.full_name, "full_name")?;

        let mut scope = CompanyScope::for_auth_user(&self.pool, auth.user_id).await?;

        let existing: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT id FROM profiles WHERE auth_user_id = $1")
                .bind(auth.user_id)
                .fetch_optional(scope.conn())
                .await?;
        if existing.is_some() {
            return Err(OnboardingError::ProfileExists);
        }

        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (name) VALUES ($1) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(&company_name)
        .fetch_one(scope.conn())
        .await?;

        scope.set_company(company.id).await?;

        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles \
             (auth_user_id, company_id, email, full_name, role_type, department, onboarding_completed) \
             VALUES ($1, $2, $3, $4, 'corporativo', $5, true) \
             ON CONFLICT (auth_user_id) DO NOTHING \
             RETURNING id, auth_user_id, company_id, email, full_name, role_type, \
                       department, onboarding_completed, created_at, updated_at",
        )
        .bind(auth.user_id)
        .bind(company.id)
        .bind(&auth.email)
        .bind(&full_name)
        .bind(&req.department)
        .fetch_optional(scope.conn())
        .await?
        // Raced a concurrent onboarding or acceptance; dropping the scope
        // rolls the company insert back.
        .ok_or(OnboardingError::ProfileExists)?;

        sqlx::query(
            "INSERT INTO profile_permissions (profile_id, permission) VALUES ($1, 'okr_admin')",
        )
        .bind(profile.id)
        .execute(scope.conn())
        .await?;

        scope.commit().await?;

        tracing::info!(
            "Company {} created by profile {} ({})",
            company.id,
            profile.id,
            profile.email
        );

        Ok((company, profile))
    }
}

fn validate_name(value: &str, field: &str) -> Result<String, OnboardingError> {
    let value = value.trim();
    if value.len() < 2 || value.len() > 100 {
        return Err(OnboardingError::InvalidInput(format!(
            "{} must be between 2 and 100 characters",
            field
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation_trims_and_bounds() {
        assert_eq!(validate_name("  Acme Corp  ", "company_name").unwrap(), "Acme Corp");
        assert!(validate_name("x", "company_name").is_err());
        assert!(validate_name("", "full_name").is_err());
        assert!(validate_name(&"x".repeat(101), "full_name").is_err());
    }
}
