//! Postgres-backed audit collection.
//!
//! Entries are stored as JSONB documents (`{application, content, user, task}`)
//! in the `audit_log` table, keyed by the entry id.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use rollcall_audit::{AuditError, AuditLog, LogEntry, NewLogEntry};

use crate::store::postgres::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    #[instrument(skip(self, entry), fields(user_id = %entry.user))]
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        let stored = LogEntry::stamp(entry, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO audit_log (id, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*stored.id.as_uuid())
        .bind(Json(&stored.body))
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Store(map_sqlx_error("append_audit_entry", e).to_string()))?;

        tracing::debug!(log_entry_id = %stored.id, "audit entry appended");
        Ok(stored)
    }
}
