use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::lockout::LoginAttemptGovernor;
use crate::auth::password;
use crate::auth::revocation::RevocationStore;
use crate::auth::tokens::TokenConfig;
use crate::database::models::{
    Account, AccountProfile, AttemptReason, ClientMeta, LoginAttempt, NewAccount, Role,
};
use crate::database::store::AccountStore;
use crate::error::ApiError;
use crate::types::Clock;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub role: Option<String>,
    pub institution_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionBundle {
    pub user: AccountProfile,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Orchestrates the register / login / refresh / logout / profile lifecycle.
///
/// The only component that mutates credential/session fields in the store.
/// Every operation returns `Result<_, ApiError>`; store, hash, and token
/// failures are translated here and never cross into handlers raw.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    revocations: Arc<dyn RevocationStore>,
    tokens: Arc<TokenConfig>,
    clock: Arc<dyn Clock>,
    governor: LoginAttemptGovernor,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        revocations: Arc<dyn RevocationStore>,
        tokens: Arc<TokenConfig>,
        clock: Arc<dyn Clock>,
        governor: LoginAttemptGovernor,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            revocations,
            tokens,
            clock,
            governor,
            bcrypt_cost,
        }
    }

    /// POST /auth/register
    pub async fn register(&self, input: RegisterInput) -> Result<SessionBundle, ApiError> {
        let name = input.name.trim().to_string();
        let surname = input.surname.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if name.is_empty() || surname.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(ApiError::validation(
                "Name, surname, email and password are required",
            ));
        }
        if !EMAIL_PATTERN.is_match(&email) {
            return Err(ApiError::validation("Invalid email format"));
        }
        if input.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::validation(
                "Password must be at least 6 characters long",
            ));
        }

        let role = match input.role.as_deref() {
            None => Role::Buyer,
            Some(value) => {
                Role::parse(value).ok_or_else(|| ApiError::validation("Invalid role"))?
            }
        };
        if role.is_institution_scoped() && input.institution_id.is_none() {
            return Err(ApiError::validation(
                "Institution-scoped roles require an institution_id",
            ));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("An account with that email already exists"));
        }
        if let Some(national_id) = input.national_id.as_deref() {
            if self.store.national_id_exists(national_id).await? {
                return Err(ApiError::conflict(
                    "An account with that national id already exists",
                ));
            }
        }
        if let Some(institution_id) = input.institution_id {
            if !self.store.institution_is_active(institution_id).await? {
                return Err(ApiError::bad_request(
                    "Institution does not exist or is not active",
                ));
            }
        }

        let password_hash = self.hash_password(input.password.clone()).await?;

        let account = self
            .store
            .insert_account(NewAccount {
                name,
                surname,
                email,
                password_hash,
                phone: input.phone,
                national_id: input.national_id,
                role,
                institution_id: input.institution_id,
            })
            .await?;

        let tokens = self.issue_session_tokens(&account).await?;
        info!(account_id = %account.id, role = role.as_str(), "Account registered");

        Ok(SessionBundle {
            user: account.profile(),
            tokens,
        })
    }

    /// POST /auth/login
    pub async fn login(&self, input: LoginInput, meta: ClientMeta) -> Result<SessionBundle, ApiError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || input.password.is_empty() {
            return Err(ApiError::validation("Email and password are required"));
        }

        let Some(mut account) = self.store.find_by_email(&email).await? else {
            self.log_attempt(LoginAttempt::failure(&email, &meta, AttemptReason::AccountNotFound))
                .await;
            return Err(ApiError::InvalidCredentials);
        };

        if self.governor.is_locked(&account) {
            self.log_attempt(LoginAttempt::failure(&email, &meta, AttemptReason::AccountLocked))
                .await;
            return Err(ApiError::Locked {
                // is_locked guarantees the field is set
                locked_until: account.locked_until.unwrap_or_else(|| self.clock.now()),
            });
        }

        if !account.is_active() {
            self.log_attempt(LoginAttempt::failure(&email, &meta, AttemptReason::AccountInactive))
                .await;
            return Err(ApiError::InvalidCredentials);
        }

        if !account.institution_is_active() {
            self.log_attempt(LoginAttempt::failure(
                &email,
                &meta,
                AttemptReason::InstitutionInactive,
            ))
            .await;
            return Err(ApiError::InvalidCredentials);
        }

        if !self.verify_password(input.password.clone(), account.password_hash.clone()).await? {
            self.governor.on_failure(account.id).await?;
            self.log_attempt(LoginAttempt::failure(&email, &meta, AttemptReason::BadPassword))
                .await;
            return Err(ApiError::InvalidCredentials);
        }

        self.governor.on_success(account.id).await?;

        let now = self.clock.now();
        self.store.set_last_login(account.id, now).await?;
        account.last_login = Some(now);

        let tokens = self.issue_session_tokens(&account).await?;
        self.log_attempt(LoginAttempt::success(&email, &meta)).await;
        info!(account_id = %account.id, "Login succeeded");

        Ok(SessionBundle {
            user: account.profile(),
            tokens,
        })
    }

    /// POST /auth/refresh - issues a new access token only; the refresh
    /// token is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, ApiError> {
        if self.revocations.is_revoked(refresh_token).await {
            return Err(ApiError::RevokedToken);
        }

        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        // The presented token must match the stored single slot; a replay
        // after logout fails here even though the signature is still valid
        let Some(account) = self
            .store
            .find_by_id_and_refresh_token(claims.sub, refresh_token)
            .await?
        else {
            return Err(ApiError::InvalidToken);
        };

        if !account.is_active() {
            return Err(ApiError::InactiveUser);
        }

        let access_claims = self.tokens.access_claims(
            self.clock.now(),
            account.id,
            &account.email,
            account.role,
            account.institution_id,
            account.institution_name.as_deref(),
        );
        let access_token = self.tokens.issue_access_token(&access_claims)?;

        Ok(RefreshedToken {
            access_token,
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    /// POST /auth/logout - best effort, always succeeds.
    pub async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        if let Some(token) = access_token {
            self.revocations.revoke(token).await;
        }

        if let Some(token) = refresh_token {
            self.revocations.revoke(token).await;
            if let Err(e) = self.store.clear_refresh_token_by_value(token).await {
                warn!("Failed to clear stored refresh token on logout: {}", e);
            }
        }
    }

    /// GET /auth/me - re-fetch the current account by id.
    pub async fn get_profile(&self, account_id: Uuid) -> Result<AccountProfile, ApiError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Account not found"))?;
        Ok(account.profile())
    }

    async fn issue_session_tokens(&self, account: &Account) -> Result<TokenPair, ApiError> {
        let now = self.clock.now();

        let access_claims = self.tokens.access_claims(
            now,
            account.id,
            &account.email,
            account.role,
            account.institution_id,
            account.institution_name.as_deref(),
        );
        let access_token = self.tokens.issue_access_token(&access_claims)?;

        let refresh_claims = self.tokens.refresh_claims(now, account.id, &account.email);
        let refresh_token = self.tokens.issue_refresh_token(&refresh_claims)?;

        // Single live refresh token per account: issuing overwrites the slot
        self.store.set_refresh_token(account.id, Some(&refresh_token)).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    // bcrypt is CPU-bound; run it off the event loop so other requests
    // keep making progress while a hash is in flight
    async fn hash_password(&self, plaintext: String) -> Result<String, ApiError> {
        let cost = self.bcrypt_cost;
        let digest = tokio::task::spawn_blocking(move || password::hash_password(&plaintext, cost))
            .await
            .map_err(|e| ApiError::internal(format!("hashing task failed: {e}")))??;
        Ok(digest)
    }

    async fn verify_password(&self, plaintext: String, digest: String) -> Result<bool, ApiError> {
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &digest))
                .await
                .map_err(|e| ApiError::internal(format!("verify task failed: {e}")))?;
        Ok(matches)
    }

    /// The attempt log is append-only and best-effort; a logging failure
    /// never fails the login itself.
    async fn log_attempt(&self, attempt: LoginAttempt) {
        if let Err(e) = self.store.log_login_attempt(&attempt).await {
            warn!("Failed to write login attempt log: {}", e);
        }
    }
}
