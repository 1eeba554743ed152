use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Account, LoginAttempt, NewAccount};

/// Errors from the credential store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),

    /// A unique index rejected the write; names the colliding field.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Credential store seam. The auth service is the only caller permitted to
/// mutate the session fields, and every mutation here is a single atomic
/// statement so no in-process locking is needed.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn national_id_exists(&self, national_id: &str) -> Result<bool, StoreError>;

    /// True iff the institution exists and its status is active.
    async fn institution_is_active(&self, institution_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Overwrite the single refresh-token slot (None clears it).
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError>;

    /// Clear whichever account currently holds this refresh-token value.
    /// A no-op when no account matches.
    async fn clear_refresh_token_by_value(&self, token: &str) -> Result<(), StoreError>;

    /// Fetch the account only when the presented refresh token matches the
    /// stored slot value, enabling server-side single-session revocation.
    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Increment the failed-login counter, returning the new count.
    async fn increment_failed_logins(&self, id: Uuid) -> Result<i32, StoreError>;

    async fn set_locked_until(&self, id: Uuid, until: DateTime<Utc>) -> Result<(), StoreError>;

    /// Reset the counter to zero and clear any lockout.
    async fn reset_failed_logins(&self, id: Uuid) -> Result<(), StoreError>;

    async fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Append to the login attempt log.
    async fn log_login_attempt(&self, attempt: &LoginAttempt) -> Result<(), StoreError>;
}

/// Postgres-backed credential store.
pub struct PgAccountStore {
    pool: PgPool,
}

/// Account columns joined with the owning institution's name and activity.
const ACCOUNT_SELECT: &str = r#"
    SELECT a.id, a.name, a.surname, a.email, a.password_hash, a.phone,
           a.national_id, a.role, a.status, a.institution_id,
           i.name AS institution_name,
           (i.status = 'active') AS institution_active,
           a.failed_login_count, a.locked_until, a.refresh_token,
           a.last_login, a.created_at
    FROM accounts a
    LEFT JOIN institutions i ON a.institution_id = i.id
"#;

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("{ACCOUNT_SELECT} WHERE LOWER(a.email) = LOWER($1)");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("{ACCOUNT_SELECT} WHERE a.id = $1");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn national_id_exists(&self, national_id: &str) -> Result<bool, StoreError> {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE national_id = $1")
                .bind(national_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(exists.is_some())
    }

    async fn institution_is_active(&self, institution_id: Uuid) -> Result<bool, StoreError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM institutions WHERE id = $1 AND status = 'active'")
                .bind(institution_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO accounts
                (name, surname, email, password_hash, phone, national_id, role, institution_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&account.name)
        .bind(&account.surname)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.phone)
        .bind(&account.national_id)
        .bind(account.role)
        .bind(account.institution_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match duplicate_field(&e) {
            Some(field) => StoreError::Duplicate(field),
            None => StoreError::Sqlx(e),
        })?;

        // Re-fetch joined with the institution name, as clients see it
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::Inconsistent(format!("account {} vanished after insert", id))
        })
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET refresh_token = $1 WHERE id = $2")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_refresh_token_by_value(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET refresh_token = NULL WHERE refresh_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!("{ACCOUNT_SELECT} WHERE a.id = $1 AND a.refresh_token = $2");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn increment_failed_logins(&self, id: Uuid) -> Result<i32, StoreError> {
        let (count,): (i32,) = sqlx::query_as(
            r#"
            UPDATE accounts
            SET failed_login_count = failed_login_count + 1
            WHERE id = $1
            RETURNING failed_login_count
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn set_locked_until(&self, id: Uuid, until: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET locked_until = $1 WHERE id = $2")
            .bind(until)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_failed_logins(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE accounts SET failed_login_count = 0, locked_until = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn log_login_attempt(&self, attempt: &LoginAttempt) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (email, ip_address, user_agent, success, failure_reason)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&attempt.email)
        .bind(&attempt.ip_address)
        .bind(&attempt.user_agent)
        .bind(attempt.success)
        .bind(attempt.reason.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Postgres unique-violation (23505) mapped to the colliding field, so a
/// racing insert that slips past the service's pre-checks still answers as
/// a conflict rather than an internal error.
fn duplicate_field(err: &sqlx::Error) -> Option<&'static str> {
    let db = err.as_database_error()?;
    if db.code().as_deref() != Some("23505") {
        return None;
    }
    match db.constraint() {
        Some("accounts_national_id_idx") => Some("national id"),
        _ => Some("email"),
    }
}
