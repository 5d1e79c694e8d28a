//! Service wiring: repositories, audit log, hashing and token issuing.

use std::sync::Arc;

use thiserror::Error;

use rollcall_audit::{AuditLog, AuditMessages, InMemoryAuditLog};
use rollcall_auth::{Hs256JwtIssuer, PasswordHash, PasswordHasher};
use rollcall_infra::{
    AppConfig, ConfigError, FileRepository, InMemoryStore, PersonRepository, PgStore,
    PostgresAuditLog, StoreError, UserRepository,
};

use crate::app::errors::ApiError;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a handler needs, shared across requests behind an `Arc`.
pub struct AppServices {
    pub people: Arc<dyn PersonRepository>,
    pub users: Arc<dyn UserRepository>,
    pub files: Arc<dyn FileRepository>,
    pub audit: Arc<dyn AuditLog>,
    pub hasher: PasswordHasher,
    pub issuer: Hs256JwtIssuer,
    pub messages: AuditMessages,
    pub config: AppConfig,
}

impl AppServices {
    /// Pick the backend from `config.database_url`: Postgres when set,
    /// in-memory otherwise.
    pub async fn connect(config: AppConfig) -> Result<Self, ServicesError> {
        match config.database_url.clone() {
            Some(url) => {
                let store = PgStore::connect(&url).await?;
                store.ensure_schema().await?;
                let audit = Arc::new(PostgresAuditLog::new(store.pool().clone()));
                let store = Arc::new(store);
                tracing::info!("using postgres stores");
                Ok(Self::with_stores(
                    config,
                    store.clone(),
                    store.clone(),
                    store,
                    audit,
                )?)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores");
                Ok(Self::in_memory(config)?)
            }
        }
    }

    pub fn in_memory(config: AppConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(InMemoryStore::new());
        Self::with_stores(
            config,
            store.clone(),
            store.clone(),
            store,
            Arc::new(InMemoryAuditLog::new()),
        )
    }

    pub fn with_stores(
        config: AppConfig,
        people: Arc<dyn PersonRepository>,
        users: Arc<dyn UserRepository>,
        files: Arc<dyn FileRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            people,
            users,
            files,
            audit,
            hasher: config.password_hasher()?,
            issuer: Hs256JwtIssuer::new(config.jwt_secret.as_bytes()),
            messages: config.audit_messages(),
            config,
        })
    }

    /// bcrypt is CPU-bound; run it off the async workers.
    pub async fn hash_password(&self, password: String) -> Result<PasswordHash, ApiError> {
        let hasher = self.hasher;
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Downstream(format!("hashing task failed: {e}")))??;
        Ok(hash)
    }

    pub async fn verify_password(
        &self,
        password: String,
        hash: PasswordHash,
    ) -> Result<bool, ApiError> {
        let hasher = self.hasher;
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ApiError::Downstream(format!("hashing task failed: {e}")))??;
        Ok(matches)
    }
}
