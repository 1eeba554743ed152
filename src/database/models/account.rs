use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of permission levels. Stored as varchar; adding a role here
/// forces every role-conditioned match in the crate to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum Role {
    GlobalAdmin,
    InstitutionAdmin,
    Seller,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::GlobalAdmin => "global_admin",
            Role::InstitutionAdmin => "institution_admin",
            Role::Seller => "seller",
            Role::Buyer => "buyer",
        }
    }

    /// Parse a role supplied in a request body. Exhaustive over the enum;
    /// anything else is a validation failure at the edge.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "global_admin" => Some(Role::GlobalAdmin),
            "institution_admin" => Some(Role::InstitutionAdmin),
            "seller" => Some(Role::Seller),
            "buyer" => Some(Role::Buyer),
            _ => None,
        }
    }

    /// Roles that must be tied to an existing, active institution.
    pub fn is_institution_scoped(&self) -> bool {
        matches!(self, Role::InstitutionAdmin | Role::Seller)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// A system identity as stored in the credential store, joined with the
/// institution it belongs to (when any). Only the auth service mutates the
/// session fields (failed_login_count, locked_until, refresh_token,
/// last_login).
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub institution_id: Option<Uuid>,
    pub institution_name: Option<String>,
    pub institution_active: Option<bool>,
    pub failed_login_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// An account without an institution passes the institution check;
    /// one tied to a missing or inactive institution does not.
    pub fn institution_is_active(&self) -> bool {
        match self.institution_id {
            None => true,
            Some(_) => self.institution_active.unwrap_or(false),
        }
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            name: self.name.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            national_id: self.national_id.clone(),
            role: self.role,
            status: self.status,
            institution_id: self.institution_id,
            institution_name: self.institution_name.clone(),
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

/// Client-facing view of an account. Never carries the password hash,
/// failure counters, lockout field, or stored refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub institution_id: Option<Uuid>,
    pub institution_name: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new account at registration.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub role: Role,
    pub institution_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_round_trips() {
        for role in [Role::GlobalAdmin, Role::InstitutionAdmin, Role::Seller, Role::Buyer] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn institution_scoped_roles() {
        assert!(Role::InstitutionAdmin.is_institution_scoped());
        assert!(Role::Seller.is_institution_scoped());
        assert!(!Role::GlobalAdmin.is_institution_scoped());
        assert!(!Role::Buyer.is_institution_scoped());
    }
}
