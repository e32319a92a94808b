use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Route prefix shared by every versioned endpoint.
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub secret_key: String,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limited_paths: Vec<String>,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required secret '{0}' not found in environment variables")]
    MissingSecret(&'static str),
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },
}

impl AppConfig {
    /// Build the configuration once at process start. The result is passed by
    /// injection into everything that needs it; there is no global.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = env::var("SECRET_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingSecret("SECRET_KEY"))?;

        if secret_key.len() < 32 || secret_key.to_lowercase().contains("dev") {
            tracing::warn!(
                "SECRET_KEY is using a weak value; this is only suitable for development"
            );
        }

        let config = Self {
            server: ServerConfig { port: 8000 },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 5,
            },
            security: SecurityConfig {
                secret_key,
                algorithm: "HS256".to_string(),
                access_token_expire_minutes: 30,
                cors_origins: Vec::new(),
            },
            api: ApiConfig {
                rate_limit_requests: 50,
                rate_limit_window_secs: 60,
                rate_limited_paths: vec![
                    format!("{}/auth/token", API_PREFIX),
                    format!("{}/auth/register", API_PREFIX),
                ],
                max_request_size_bytes: 10 * 1024 * 1024,
            },
        }
        .with_env_overrides();

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.is_empty() {
                self.database.url = v;
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        // Security overrides
        if let Ok(v) = env::var("ALGORITHM") {
            if !v.is_empty() {
                self.security.algorithm = v;
            }
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.security.access_token_expire_minutes = v
                .parse()
                .unwrap_or(self.security.access_token_expire_minutes);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // API overrides
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.access_token_expire_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                message: "token expiry must be positive".to_string(),
            });
        }
        if self.api.max_request_size_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "API_MAX_REQUEST_SIZE_BYTES",
                message: "request size ceiling must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig { port: 0 },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        security: SecurityConfig {
            secret_key: "0123456789abcdef0123456789abcdef".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            cors_origins: Vec::new(),
        },
        api: ApiConfig {
            rate_limit_requests: 50,
            rate_limit_window_secs: 60,
            rate_limited_paths: vec![format!("{}/auth/token", API_PREFIX)],
            max_request_size_bytes: 1024,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_token_expiry() {
        let mut config = test_config();
        config.security.access_token_expire_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_size_ceiling() {
        let mut config = test_config();
        config.api.max_request_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_sane_defaults() {
        assert!(test_config().validate().is_ok());
    }
}
