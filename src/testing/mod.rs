//! Test support: in-memory store implementations and a manual time source.
//!
//! Integration tests drive the real router against these backings, so the
//! module is compiled into the library rather than gated behind cfg(test).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::revocation::InMemoryRevocationStore;
use crate::auth::tokens::TokenConfig;
use crate::config::{ApiConfig, SecurityConfig};
use crate::database::models::{Account, AccountStatus, LoginAttempt, NewAccount};
use crate::database::store::{AccountStore, StoreError};
use crate::state::AppState;
use crate::types::Clock;

/// Time source that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Credential store over in-process maps. Mirrors the Postgres store's
/// semantics closely enough for the auth lifecycle tests: case-insensitive
/// email lookup, single refresh-token slot, append-only attempt log.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    institutions: RwLock<HashMap<Uuid, (String, bool)>>,
    attempts: RwLock<Vec<LoginAttempt>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_institution(&self, name: &str, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        let mut institutions = self.institutions.write().await;
        institutions.insert(id, (name.to_string(), active));
        id
    }

    pub async fn set_status(&self, id: Uuid, status: AccountStatus) {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.status = status;
        }
    }

    pub async fn account(&self, id: Uuid) -> Option<Account> {
        let accounts = self.accounts.read().await;
        accounts.get(&id).cloned()
    }

    pub async fn attempts(&self) -> Vec<LoginAttempt> {
        let attempts = self.attempts.read().await;
        attempts.clone()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn national_id_exists(&self, national_id: &str) -> Result<bool, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .any(|a| a.national_id.as_deref() == Some(national_id)))
    }

    async fn institution_is_active(&self, institution_id: Uuid) -> Result<bool, StoreError> {
        let institutions = self.institutions.read().await;
        Ok(institutions
            .get(&institution_id)
            .map(|(_, active)| *active)
            .unwrap_or(false))
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let institutions = self.institutions.read().await;
        let (institution_name, institution_active) = match account.institution_id {
            Some(id) => match institutions.get(&id) {
                Some((name, active)) => (Some(name.clone()), Some(*active)),
                None => (None, Some(false)),
            },
            None => (None, None),
        };
        drop(institutions);

        let stored = Account {
            id: Uuid::new_v4(),
            name: account.name,
            surname: account.surname,
            email: account.email,
            password_hash: account.password_hash,
            phone: account.phone,
            national_id: account.national_id,
            role: account.role,
            status: AccountStatus::Active,
            institution_id: account.institution_id,
            institution_name,
            institution_active,
            failed_login_count: 0,
            locked_until: None,
            refresh_token: None,
            last_login: None,
            created_at: Utc::now(),
        };

        let mut accounts = self.accounts.write().await;
        // Mirror the unique indexes on the Postgres store
        if accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&stored.email))
        {
            return Err(StoreError::Duplicate("email"));
        }
        if let Some(national_id) = stored.national_id.as_deref() {
            if accounts
                .values()
                .any(|a| a.national_id.as_deref() == Some(national_id))
            {
                return Err(StoreError::Duplicate("national id"));
            }
        }
        accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn clear_refresh_token_by_value(&self, token: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        for account in accounts.values_mut() {
            if account.refresh_token.as_deref() == Some(token) {
                account.refresh_token = None;
            }
        }
        Ok(())
    }

    async fn find_by_id_and_refresh_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&id)
            .filter(|a| a.refresh_token.as_deref() == Some(token))
            .cloned())
    }

    async fn increment_failed_logins(&self, id: Uuid) -> Result<i32, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Inconsistent(format!("no account {}", id)))?;
        account.failed_login_count += 1;
        Ok(account.failed_login_count)
    }

    async fn set_locked_until(&self, id: Uuid, until: DateTime<Utc>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.locked_until = Some(until);
        }
        Ok(())
    }

    async fn reset_failed_logins(&self, id: Uuid) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.failed_login_count = 0;
            account.locked_until = None;
        }
        Ok(())
    }

    async fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.last_login = Some(at);
        }
        Ok(())
    }

    async fn log_login_attempt(&self, attempt: &LoginAttempt) -> Result<(), StoreError> {
        let mut attempts = self.attempts.write().await;
        attempts.push(attempt.clone());
        Ok(())
    }
}

/// Fully wired application state over in-memory backings, plus handles to
/// the pieces tests poke at directly.
pub struct TestEnv {
    pub state: AppState,
    pub store: Arc<InMemoryAccountStore>,
    pub revocations: Arc<InMemoryRevocationStore>,
    pub clock: Arc<ManualClock>,
}

pub fn test_security_config() -> SecurityConfig {
    SecurityConfig {
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        access_token_ttl_minutes: 15,
        refresh_token_ttl_days: 7,
        token_issuer: "rifas-solidarias-api".to_string(),
        token_audience: "rifas-solidarias-app".to_string(),
        // bcrypt's minimum cost keeps the adaptive work factor out of the
        // test runtime (the crate does not export it as a constant)
        bcrypt_cost: 4,
        max_failed_logins: 5,
        lockout_minutes: 30,
    }
}

pub fn test_env() -> TestEnv {
    let store = Arc::new(InMemoryAccountStore::new());
    let revocations = Arc::new(InMemoryRevocationStore::new());
    let clock = Arc::new(ManualClock::default());

    let security = test_security_config();
    let api = ApiConfig {
        enable_rate_limiting: false,
        rate_limit_requests: 1000,
        rate_limit_window_secs: 60,
        trust_proxy_headers: false,
    };

    let state = AppState::new(
        store.clone(),
        revocations.clone(),
        clock.clone(),
        TokenConfig::from_security(&security),
        &security,
        &api,
        None,
    );

    TestEnv {
        state,
        store,
        revocations,
        clock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;

    fn new_account(email: &str, national_id: Option<&str>) -> NewAccount {
        NewAccount {
            name: "Ana".to_string(),
            surname: "Silva".to_string(),
            email: email.to_string(),
            password_hash: "digest".to_string(),
            phone: None,
            national_id: national_id.map(str::to_string),
            role: Role::Buyer,
            institution_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_reported_as_such() {
        let store = InMemoryAccountStore::new();
        store
            .insert_account(new_account("ana@example.com", None))
            .await
            .unwrap();

        let err = store
            .insert_account(new_account("ANA@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));

        store
            .insert_account(new_account("bia@example.com", Some("123")))
            .await
            .unwrap();
        let err = store
            .insert_account(new_account("carla@example.com", Some("123")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("national id")));
    }
}
