//! Infrastructure layer: configuration, relational stores, audit collection.

pub mod audit_store;
pub mod config;
pub mod store;

pub use audit_store::PostgresAuditLog;
pub use config::{AppConfig, ConfigError, ConflictPolicy};
pub use store::{
    FileRepository, InMemoryStore, PersonBrief, PersonRepository, PgStore, StoreError,
    StoredFile, UserRepository, UserSummary,
};
