/// Configuration management for the wiki service
use crate::error::{WikiError, WikiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Upper bound for `TOKEN_TTL_HOURS` (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub authentication: AuthConfig,
    pub admin: AdminConfig,
    pub password_policy: PasswordPolicyConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite://...`, a bare file path, or `postgres://...`
    pub url: String,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

/// Initial admin bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    /// Where a generated temporary password is written
    pub credentials_file: PathBuf,
}

/// Password rules applied on registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub require_special_chars: bool,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL; the in-memory cache is used when unset or unreachable
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub default_ttl: u64,
    pub search_ttl: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 5000,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/wiki.sqlite".to_string(),
                max_connections: 10,
            },
            authentication: AuthConfig {
                secret_key: String::new(),
                token_ttl_hours: 24,
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            admin: AdminConfig {
                username: "admin".to_string(),
                email: "admin@localhost".to_string(),
                password: None,
                credentials_file: PathBuf::from("./admin_credentials.txt"),
            },
            password_policy: PasswordPolicyConfig {
                min_length: 8,
                require_special_chars: false,
            },
            cache: CacheConfig {
                redis_url: None,
                key_prefix: "wiki:".to_string(),
                default_ttl: 300,
                search_ttl: 60,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: 20,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Read an env var and parse it, keeping the default on absence or parse failure
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean flag the way operators tend to write them
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> WikiResult<Self> {
        Self::load(true)
    }

    /// Like `from_env`, but `SECRET_KEY` may be absent
    ///
    /// For operator tools that never issue or check tokens.
    pub fn from_env_without_secret() -> WikiResult<Self> {
        Self::load(false)
    }

    fn load(secret_required: bool) -> WikiResult<Self> {
        dotenv::dotenv().ok();

        let defaults = ServerConfig::default();

        let hostname = env::var("WIKI_HOST").unwrap_or(defaults.service.hostname);
        let port = env::var("WIKI_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| defaults.service.port.to_string())
            .parse()
            .map_err(|_| WikiError::Validation("Invalid port number".to_string()))?;

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database.url);
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", defaults.database.max_connections);

        let secret_key = match env::var("SECRET_KEY") {
            Ok(secret) => secret,
            Err(_) if !secret_required => defaults.authentication.secret_key,
            Err(_) => return Err(WikiError::Validation("SECRET_KEY required".to_string())),
        };
        let token_ttl_hours = env_or("TOKEN_TTL_HOURS", defaults.authentication.token_ttl_hours);
        let bcrypt_cost = env_or("BCRYPT_COST", defaults.authentication.bcrypt_cost);

        let admin_username = env::var("ADMIN_USERNAME").unwrap_or(defaults.admin.username);
        let admin_email = env::var("ADMIN_EMAIL")
            .or_else(|_| env::var("INITIAL_ADMIN_EMAIL"))
            .unwrap_or(defaults.admin.email);
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty());
        let credentials_file = env::var("ADMIN_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.admin.credentials_file);

        let min_length = env_or("MIN_PASSWORD_LENGTH", defaults.password_policy.min_length);
        let require_special_chars = env_flag(
            "REQUIRE_SPECIAL_CHARS",
            defaults.password_policy.require_special_chars,
        );

        let redis_url = env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty());
        let key_prefix = env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.cache.key_prefix);
        let default_ttl = env_or("CACHE_DEFAULT_TTL", defaults.cache.default_ttl);
        let search_ttl = env_or("SEARCH_CACHE_TTL", defaults.cache.search_ttl);

        let rate_limit_enabled = env_flag("RATE_LIMIT_ENABLED", defaults.rate_limit.enabled);
        let requests_per_second =
            env_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit.requests_per_second);
        let burst_size = env_or("RATE_LIMIT_BURST", defaults.rate_limit.burst_size);

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version: defaults.service.version,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            authentication: AuthConfig {
                secret_key,
                token_ttl_hours,
                bcrypt_cost,
            },
            admin: AdminConfig {
                username: admin_username,
                email: admin_email,
                password: admin_password,
                credentials_file,
            },
            password_policy: PasswordPolicyConfig {
                min_length,
                require_special_chars,
            },
            cache: CacheConfig {
                redis_url,
                key_prefix,
                default_ttl,
                search_ttl,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                requests_per_second,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> WikiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(WikiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.database.url.trim().is_empty() {
            return Err(WikiError::Validation("DATABASE_URL cannot be empty".to_string()));
        }

        if self.authentication.secret_key.len() < 32 {
            return Err(WikiError::Validation(
                "SECRET_KEY must be at least 32 characters".to_string(),
            ));
        }

        if !(4..=31).contains(&self.authentication.bcrypt_cost) {
            return Err(WikiError::Validation(
                "BCRYPT_COST must be between 4 and 31".to_string(),
            ));
        }

        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.authentication.token_ttl_hours) {
            return Err(WikiError::Validation(format!(
                "TOKEN_TTL_HOURS must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }

        if self.password_policy.min_length == 0 {
            return Err(WikiError::Validation(
                "MIN_PASSWORD_LENGTH must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.authentication.secret_key = "x".repeat(32);
        config
    }

    #[test]
    fn test_default_config_requires_secret() {
        assert!(ServerConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = valid_config();
        config.authentication.secret_key = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let mut config = valid_config();
        config.authentication.bcrypt_cost = 3;
        assert!(config.validate().is_err());
        config.authentication.bcrypt_cost = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_ttl_bounds() {
        let mut config = valid_config();
        config.authentication.token_ttl_hours = 0;
        assert!(config.validate().is_err());
        config.authentication.token_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());
        config.authentication.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
