use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

const DEV_ACCESS_SECRET: &str = "rifas_dev_access_secret_do_not_use_in_prod";
const DEV_REFRESH_SECRET: &str = "rifas_dev_refresh_secret_do_not_use_in_prod";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Only set when the process sits behind a proxy that rewrites
    /// X-Forwarded-For; otherwise the header is client-controlled.
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub token_issuer: String,
    pub token_audience: String,
    pub bcrypt_cost: u32,
    pub max_failed_logins: i32,
    pub lockout_minutes: i64,
}

impl SecurityConfig {
    /// True when any signing secret is still a built-in development value,
    /// or when access and refresh share the same secret. Either condition
    /// must abort startup in production.
    pub fn has_insecure_secrets(&self) -> bool {
        self.access_token_secret == DEV_ACCESS_SECRET
            || self.refresh_token_secret == DEV_REFRESH_SECRET
            || self.access_token_secret == self.refresh_token_secret
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_TRUST_PROXY_HEADERS") {
            self.api.trust_proxy_headers = v.parse().unwrap_or(self.api.trust_proxy_headers);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_ACCESS_SECRET") {
            self.security.access_token_secret = v;
        }
        if let Ok(v) = env::var("JWT_REFRESH_SECRET") {
            self.security.refresh_token_secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_MINUTES") {
            self.security.access_token_ttl_minutes =
                v.parse().unwrap_or(self.security.access_token_ttl_minutes);
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_DAYS") {
            self.security.refresh_token_ttl_days =
                v.parse().unwrap_or(self.security.refresh_token_ttl_days);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("AUTH_MAX_FAILED_LOGINS") {
            self.security.max_failed_logins = v.parse().unwrap_or(self.security.max_failed_logins);
        }
        if let Ok(v) = env::var("AUTH_LOCKOUT_MINUTES") {
            self.security.lockout_minutes = v.parse().unwrap_or(self.security.lockout_minutes);
        }

        self
    }

    fn base_security() -> SecurityConfig {
        SecurityConfig {
            access_token_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_token_secret: DEV_REFRESH_SECRET.to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            token_issuer: "rifas-solidarias-api".to_string(),
            token_audience: "rifas-solidarias-app".to_string(),
            bcrypt_cost: 12,
            max_failed_logins: 5,
            lockout_minutes: 30,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                trust_proxy_headers: false,
            },
            security: Self::base_security(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 60,
                trust_proxy_headers: true,
            },
            security: Self::base_security(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 60,
                rate_limit_window_secs: 60,
                trust_proxy_headers: true,
            },
            security: Self::base_security(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert!(!config.api.enable_rate_limiting);
        assert_eq!(config.security.access_token_ttl_minutes, 15);
        assert_eq!(config.security.refresh_token_ttl_days, 7);
        assert_eq!(config.security.max_failed_logins, 5);
        assert_eq!(config.security.lockout_minutes, 30);
    }

    #[test]
    fn production_defaults() {
        let config = AppConfig::production();
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.security.bcrypt_cost, 12);
    }

    #[test]
    fn dev_secrets_are_flagged_insecure() {
        let config = AppConfig::development();
        assert!(config.security.has_insecure_secrets());

        let mut security = config.security.clone();
        security.access_token_secret = "a-real-access-secret".to_string();
        security.refresh_token_secret = "a-real-refresh-secret".to_string();
        assert!(!security.has_insecure_secrets());

        // Identical secrets defeat the access/refresh separation
        security.refresh_token_secret = security.access_token_secret.clone();
        assert!(security.has_insecure_secrets());
    }
}
