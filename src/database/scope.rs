use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::manager::DatabaseError;

// Transaction-local settings read by the row-level security policies.
// `set_config(key, value, true)` scopes the value to the transaction, so
// nothing leaks when the connection returns to the pool.
const SETTING_AUTH_USER: &str = "app.auth_user_id";
const SETTING_COMPANY: &str = "app.current_company_id";
const SETTING_INVITATION_TOKEN: &str = "app.invitation_token_hash";
const SETTING_SERVICE_MODE: &str = "app.service_mode";

/// A database transaction pinned to one caller's visibility.
///
/// Every request path that touches company data goes through one of these.
/// The constructors install the caller's identity as transaction-local
/// settings; the policies in the schema take it from there. Handlers and
/// services never write `WHERE company_id = ...` themselves.
///
/// Dropping a scope without calling [`commit`](Self::commit) rolls the
/// transaction back.
pub struct CompanyScope {
    tx: Transaction<'static, Postgres>,
}

impl CompanyScope {
    /// Scope for a member acting inside their company.
    pub async fn for_company(
        pool: &PgPool,
        auth_user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Self, DatabaseError> {
        let mut tx = pool.begin().await?;
        apply(&mut tx, SETTING_AUTH_USER, &auth_user_id.to_string()).await?;
        apply(&mut tx, SETTING_COMPANY, &company_id.to_string()).await?;
        Ok(Self { tx })
    }

    /// Scope for an authenticated user with no company yet. Only rows the
    /// bootstrap policies tie to `auth_user_id` are visible (their own
    /// profile, nothing else).
    pub async fn for_auth_user(pool: &PgPool, auth_user_id: Uuid) -> Result<Self, DatabaseError> {
        let mut tx = pool.begin().await?;
        apply(&mut tx, SETTING_AUTH_USER, &auth_user_id.to_string()).await?;
        Ok(Self { tx })
    }

    /// Scope for an anonymous invitation preview. Exposes exactly the
    /// invitation row matching the token hash.
    pub async fn for_invitation_token(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Self, DatabaseError> {
        let mut tx = pool.begin().await?;
        apply(&mut tx, SETTING_INVITATION_TOKEN, token_hash).await?;
        Ok(Self { tx })
    }

    /// Cross-company scope for scheduled jobs and the inbound webhook.
    /// Never reachable from request handlers that act on behalf of a user.
    pub async fn service(pool: &PgPool) -> Result<Self, DatabaseError> {
        let mut tx = pool.begin().await?;
        apply(&mut tx, SETTING_SERVICE_MODE, "on").await?;
        Ok(Self { tx })
    }

    /// Widen an existing scope with the invitation token hash. Used during
    /// acceptance, where the caller is authenticated but the invitation row
    /// is only reachable through its token.
    pub async fn set_invitation_token(&mut self, token_hash: &str) -> Result<(), DatabaseError> {
        apply(&mut self.tx, SETTING_INVITATION_TOKEN, token_hash).await
    }

    /// Pin the company id mid-transaction. Acceptance needs this: the
    /// company is only known after the invitation row has been read, but the
    /// profile insert that follows must pass the company write policy.
    pub async fn set_company(&mut self, company_id: Uuid) -> Result<(), DatabaseError> {
        apply(&mut self.tx, SETTING_COMPANY, &company_id.to_string()).await
    }

    /// Executor for queries running inside this scope.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn apply(
    tx: &mut Transaction<'static, Postgres>,
    key: &str,
    value: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("SELECT set_config($1, $2, true)")
        .bind(key)
        .bind(value)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
