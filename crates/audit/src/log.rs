use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::{LogEntry, NewLogEntry};

#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing document store rejected or failed the write.
    #[error("audit store failure: {0}")]
    Store(String),

    /// Internal lock poisoning (in-memory sink only).
    #[error("audit log poisoned")]
    Poisoned,
}

/// Append-only audit capability.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError>;
}

#[async_trait]
impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        (**self).append(entry).await
    }
}

/// In-memory audit log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, oldest first.
    ///
    /// A poisoned lock still yields the entries it holds.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        let stored = LogEntry::stamp(entry, Utc::now());
        self.entries
            .lock()
            .map_err(|_| AuditError::Poisoned)?
            .push(stored.clone());

        tracing::debug!(log_entry_id = %stored.id, user_id = %stored.body.user, "audit entry appended");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::UserId;

    fn entry(content: &str) -> NewLogEntry {
        NewLogEntry {
            application: "rollcall/acme".to_string(),
            content: content.to_string(),
            user: UserId::new(),
            task: None,
        }
    }

    #[tokio::test]
    async fn append_preserves_order_and_stamps_entries() {
        let log = InMemoryAuditLog::new();
        let first = log.append(entry("first")).await.unwrap();
        log.append(entry("second")).await.unwrap();

        let all = log.entries();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(all[1].body.content, "second");
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn entries_survive_a_poisoned_lock() {
        let log = Arc::new(InMemoryAuditLog::new());
        log.append(entry("before the panic")).await.unwrap();

        let poisoner = log.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the audit lock");
        })
        .join();

        let all = log.entries();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].body.content, "before the panic");
        assert!(matches!(
            log.append(entry("after")).await,
            Err(AuditError::Poisoned)
        ));
    }

    #[tokio::test]
    async fn shared_handle_appends_to_same_log() {
        let log = Arc::new(InMemoryAuditLog::new());
        let dyn_log: Arc<dyn AuditLog> = log.clone();
        dyn_log.append(entry("via trait object")).await.unwrap();
        assert_eq!(log.entries().len(), 1);
    }
}
