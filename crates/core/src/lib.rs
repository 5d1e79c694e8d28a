//! `rollcall-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and pagination.

pub mod error;
pub mod id;
pub mod pagination;

pub use error::{DomainError, DomainResult};
pub use id::{FileId, LogEntryId, PersonId, UserId};
pub use pagination::{PAGE_SIZE, PageQuery, PageRequest};
