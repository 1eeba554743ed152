use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::Role;

/// Claims carried by an access token. Short-lived and stateless; validity
/// is cryptographic plus expiry plus the revocation-registry check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub institution_name: Option<String>,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Minimal claim set for refresh tokens. Signed with a separate secret so a
/// leaked refresh secret cannot mint access tokens, and vice versa. The jti
/// makes every issuance distinct even within one second, so overwriting the
/// stored single slot always invalidates the previous token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token invalid")]
    Invalid,

    #[error("token generation error: {0}")]
    Generation(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

/// Signing configuration for both token kinds.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: String,
    pub audience: String,
}

impl TokenConfig {
    pub fn from_security(security: &SecurityConfig) -> Self {
        Self {
            access_secret: security.access_token_secret.clone(),
            refresh_secret: security.refresh_token_secret.clone(),
            access_ttl: Duration::minutes(security.access_token_ttl_minutes),
            refresh_ttl: Duration::days(security.refresh_token_ttl_days),
            issuer: security.token_issuer.clone(),
            audience: security.token_audience.clone(),
        }
    }

    /// Access-token lifetime in seconds, reported as `expires_in`.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Identity payload for an account, stamped with issuer/audience and
    /// the configured expiry.
    pub fn access_claims(
        &self,
        now: DateTime<Utc>,
        account_id: Uuid,
        email: &str,
        role: Role,
        institution_id: Option<Uuid>,
        institution_name: Option<&str>,
    ) -> AccessClaims {
        AccessClaims {
            sub: account_id,
            email: email.to_string(),
            role,
            institution_id,
            institution_name: institution_name.map(str::to_string),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        }
    }

    pub fn refresh_claims(&self, now: DateTime<Utc>, account_id: Uuid, email: &str) -> RefreshClaims {
        RefreshClaims {
            sub: account_id,
            email: email.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        }
    }

    pub fn issue_access_token(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        sign(claims, &self.access_secret)
    }

    pub fn issue_refresh_token(&self, claims: &RefreshClaims) -> Result<String, TokenError> {
        sign(claims, &self.refresh_secret)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, &self.access_secret)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, &self.refresh_secret)
    }

    fn verify<C: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        secret: &str,
    ) -> Result<C, TokenError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<C>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
        Ok(data.claims)
    }
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Generation("empty signing secret".to_string()));
    }

    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| TokenError::Generation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            issuer: "rifas-solidarias-api".to_string(),
            audience: "rifas-solidarias-app".to_string(),
        }
    }

    fn sample_access_claims(config: &TokenConfig) -> AccessClaims {
        config.access_claims(Utc::now(), Uuid::new_v4(), "alice@test.com", Role::Buyer, None, None)
    }

    #[test]
    fn access_token_round_trips() {
        let config = test_config();
        let claims = sample_access_claims(&config);
        let token = config.issue_access_token(&claims).unwrap();

        let decoded = config.verify_access_token(&token).unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.email, "alice@test.com");
        assert_eq!(decoded.role, Role::Buyer);
    }

    #[test]
    fn refresh_token_round_trips() {
        let config = test_config();
        let claims = config.refresh_claims(Utc::now(), Uuid::new_v4(), "alice@test.com");
        let token = config.issue_refresh_token(&claims).unwrap();

        let decoded = config.verify_refresh_token(&token).unwrap();
        assert_eq!(decoded.sub, claims.sub);
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let config = test_config();
        let now = Utc::now();
        let id = Uuid::new_v4();

        // iat/exp have second granularity; the jti must still make two
        // issuances for the same account distinct
        let a = config
            .issue_refresh_token(&config.refresh_claims(now, id, "alice@test.com"))
            .unwrap();
        let b = config
            .issue_refresh_token(&config.refresh_claims(now, id, "alice@test.com"))
            .unwrap();
        assert_ne!(a, b);

        let ca = config.access_claims(now, id, "alice@test.com", Role::Buyer, None, None);
        let cb = config.access_claims(now, id, "alice@test.com", Role::Buyer, None, None);
        assert_ne!(ca.jti, cb.jti);
    }

    #[test]
    fn secrets_are_not_interchangeable() {
        let config = test_config();

        let access = config.issue_access_token(&sample_access_claims(&config)).unwrap();
        assert_eq!(config.verify_refresh_token(&access).unwrap_err(), TokenError::Invalid);

        let refresh = config
            .issue_refresh_token(&config.refresh_claims(Utc::now(), Uuid::new_v4(), "a@b.com"))
            .unwrap();
        assert_eq!(config.verify_access_token(&refresh).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn expired_token_is_distinguished_from_invalid() {
        let config = test_config();
        // Stamp the claims far enough in the past that expiry is beyond the
        // verifier's default leeway
        let past = Utc::now() - Duration::minutes(17);
        let claims =
            config.access_claims(past, Uuid::new_v4(), "alice@test.com", Role::Buyer, None, None);
        let token = config.issue_access_token(&claims).unwrap();

        assert_eq!(config.verify_access_token(&token).unwrap_err(), TokenError::Expired);
        assert_eq!(config.verify_access_token("not-a-jwt").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.issuer = "someone-else".to_string();

        let token = other.issue_access_token(&sample_access_claims(&other)).unwrap();
        assert_eq!(config.verify_access_token(&token).unwrap_err(), TokenError::Invalid);
    }
}
