use chrono::Duration;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::database::models::Account;
use crate::database::store::{AccountStore, StoreError};
use crate::types::Clock;

/// Per-account failed-login counters with a temporary lockout window.
///
/// Bounded brute-force resistance, not a hard security boundary: concurrent
/// attempts against the same account may under-count, which is acceptable.
/// The lockout self-expires; no manual unlock exists or is needed.
#[derive(Clone)]
pub struct LoginAttemptGovernor {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    max_failed: i32,
    lockout_window: Duration,
}

impl LoginAttemptGovernor {
    pub fn new(
        store: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
        max_failed: i32,
        lockout_minutes: i64,
    ) -> Self {
        Self {
            store,
            clock,
            max_failed,
            lockout_window: Duration::minutes(lockout_minutes),
        }
    }

    /// Record a failed attempt; lock the account once the threshold is hit.
    pub async fn on_failure(&self, account_id: Uuid) -> Result<(), StoreError> {
        let count = self.store.increment_failed_logins(account_id).await?;

        if count >= self.max_failed {
            let until = self.clock.now() + self.lockout_window;
            self.store.set_locked_until(account_id, until).await?;
            warn!(
                account_id = %account_id,
                failed_count = count,
                locked_until = %until,
                "Account locked after repeated failed logins"
            );
        }

        Ok(())
    }

    /// Reset the counter and clear any lockout after a successful login.
    pub async fn on_success(&self, account_id: Uuid) -> Result<(), StoreError> {
        self.store.reset_failed_logins(account_id).await
    }

    /// True iff a lockout is set and has not yet elapsed. An expired lockout
    /// leaves the account implicitly unlocked on the next attempt.
    pub fn is_locked(&self, account: &Account) -> bool {
        match account.locked_until {
            Some(until) => self.clock.now() < until,
            None => false,
        }
    }
}
