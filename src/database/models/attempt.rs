use serde::Serialize;

/// Reason codes recorded in the append-only login attempt log. The log is
/// written by the auth service and never read back by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptReason {
    Success,
    AccountNotFound,
    AccountLocked,
    AccountInactive,
    InstitutionInactive,
    BadPassword,
}

impl AttemptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptReason::Success => "success",
            AttemptReason::AccountNotFound => "account_not_found",
            AttemptReason::AccountLocked => "account_locked",
            AttemptReason::AccountInactive => "account_inactive",
            AttemptReason::InstitutionInactive => "institution_inactive",
            AttemptReason::BadPassword => "bad_password",
        }
    }
}

/// One record per login attempt.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub email: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub reason: AttemptReason,
}

impl LoginAttempt {
    pub fn failure(email: &str, meta: &ClientMeta, reason: AttemptReason) -> Self {
        Self {
            email: email.to_string(),
            ip_address: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            success: false,
            reason,
        }
    }

    pub fn success(email: &str, meta: &ClientMeta) -> Self {
        Self {
            email: email.to_string(),
            ip_address: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            success: true,
            reason: AttemptReason::Success,
        }
    }
}

/// Source address / user agent captured from the incoming request for the
/// attempt log. Both fields are best-effort.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
