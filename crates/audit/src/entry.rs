use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{LogEntryId, UserId};

/// An entry waiting to be appended.
///
/// This is the document body; identity and timestamps are assigned by the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLogEntry {
    /// `"<app name>/<company>"`.
    pub application: String,
    /// Human-readable description of what happened.
    pub content: String,
    /// The acting user.
    pub user: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
}

/// A persisted audit record. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    #[serde(flatten)]
    pub body: NewLogEntry,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn stamp(body: NewLogEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: LogEntryId::new(),
            body,
            created_at: now,
            updated_at: now,
        }
    }
}
