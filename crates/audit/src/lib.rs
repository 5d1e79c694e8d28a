//! Append-only audit log of account actions.
//!
//! The log is a capability injected into request handlers: anything that can
//! `append` a [`NewLogEntry`] is an [`AuditLog`]. Storage adapters live in
//! `rollcall-infra`; this crate ships the in-memory sink used by dev/tests.

pub mod entry;
pub mod log;
pub mod message;

pub use entry::{LogEntry, NewLogEntry};
pub use log::{AuditError, AuditLog, InMemoryAuditLog};
pub use message::{AuditLocale, AuditMessages, long_date};
