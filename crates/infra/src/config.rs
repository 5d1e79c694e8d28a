//! Process configuration.
//!
//! Everything the handlers need from the environment is read once into an
//! [`AppConfig`] and passed down explicitly; nothing reads env vars at request
//! time.

use std::net::SocketAddr;

use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;

use rollcall_audit::{AuditLocale, AuditMessages};
use rollcall_auth::{PasswordHasher, ProfileThresholds};
use rollcall_observability::LogFormat;

/// What a handler does after detecting a uniqueness or password conflict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The first conflict becomes the response, but the write and audit append
    /// still happen.
    #[default]
    Observed,
    /// The first conflict is returned immediately; nothing is written.
    Strict,
}

impl ConflictPolicy {
    pub fn halts(&self) -> bool {
        matches!(self, ConflictPolicy::Strict)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres URL; `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub thresholds: ProfileThresholds,
    pub app_name: String,
    pub company: String,
    pub timezone: Tz,
    pub audit_locale: AuditLocale,
    pub files_base_url: String,
    pub conflict_policy: ConflictPolicy,
    pub bcrypt_cost: u32,
    pub log_format: LogFormat,
}

pub const DEV_JWT_SECRET: &str = "dev-secret";

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::invalid("BIND_ADDR", format!("{e}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let ttl_minutes = parse_or("TOKEN_TTL_MINUTES", get("TOKEN_TTL_MINUTES"), 1440i64)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::invalid("TOKEN_TTL_MINUTES", "must be positive"));
        }

        let administrator = parse_or("LEVEL_ADMINISTRATOR", get("LEVEL_ADMINISTRATOR"), 3i32)?;
        let operator = parse_or("LEVEL_OPERATOR", get("LEVEL_OPERATOR"), 2i32)?;
        let thresholds = ProfileThresholds::new(administrator, operator)
            .map_err(|e| ConfigError::invalid("LEVEL_OPERATOR", e.to_string()))?;

        let timezone = match get("TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|e| ConfigError::invalid("TIMEZONE", e.to_string()))?,
            None => chrono_tz::UTC,
        };

        let audit_locale = match get("AUDIT_LOCALE") {
            Some(raw) => raw
                .parse::<AuditLocale>()
                .map_err(|e| ConfigError::invalid("AUDIT_LOCALE", e))?,
            None => AuditLocale::default(),
        };

        let conflict_policy = match get("CONFLICT_POLICY").as_deref().map(str::to_ascii_lowercase) {
            None => ConflictPolicy::default(),
            Some(raw) if raw == "observed" => ConflictPolicy::Observed,
            Some(raw) if raw == "strict" => ConflictPolicy::Strict,
            Some(raw) => {
                return Err(ConfigError::invalid(
                    "CONFLICT_POLICY",
                    format!("'{raw}' (expected observed or strict)"),
                ));
            }
        };

        let bcrypt_cost = parse_or("BCRYPT_COST", get("BCRYPT_COST"), 8u32)?;
        PasswordHasher::new(bcrypt_cost)
            .map_err(|e| ConfigError::invalid("BCRYPT_COST", e.to_string()))?;

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("LOG_FORMAT", e))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            token_ttl: Duration::minutes(ttl_minutes),
            thresholds,
            app_name: get("APP_NAME").unwrap_or_else(|| "rollcall".to_string()),
            company: get("COMPANY").unwrap_or_else(|| "acme".to_string()),
            timezone,
            audit_locale,
            files_base_url: get("FILES_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080/files".to_string())
                .trim_end_matches('/')
                .to_string(),
            conflict_policy,
            bcrypt_cost,
            log_format,
        })
    }

    /// Deterministic configuration for tests: in-memory stores, cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            token_ttl: Duration::minutes(10),
            thresholds: ProfileThresholds::default(),
            app_name: "rollcall".to_string(),
            company: "acme".to_string(),
            timezone: chrono_tz::UTC,
            audit_locale: AuditLocale::PtBr,
            files_base_url: "http://localhost/files".to_string(),
            conflict_policy: ConflictPolicy::Observed,
            bcrypt_cost: 4,
            log_format: LogFormat::Pretty,
        }
    }

    pub fn audit_messages(&self) -> AuditMessages {
        AuditMessages::new(&self.app_name, &self.company, self.timezone, self.audit_locale)
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher, ConfigError> {
        PasswordHasher::new(self.bcrypt_cost)
            .map_err(|e| ConfigError::invalid("BCRYPT_COST", e.to_string()))
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}
