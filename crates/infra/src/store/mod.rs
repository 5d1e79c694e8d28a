//! Repository traits and their in-memory / Postgres implementations.
//!
//! Uniqueness (person document, user email, user person) is checked by the
//! handlers through `find_by_*` lookups before writing; the stores do not
//! enforce it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use rollcall_auth::{AvatarFile, User};
use rollcall_core::{FileId, PageRequest, PersonId, UserId};
use rollcall_people::Person;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("store lock poisoned")]
    Poisoned,

    /// A row could not be decoded into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// A stored file record (read-only here; used as avatars).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub id: FileId,
    pub name: String,
    pub path: String,
}

impl StoredFile {
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    pub fn avatar(&self, base_url: &str) -> AvatarFile {
        AvatarFile {
            id: self.id,
            path: self.path.clone(),
            url: self.url(base_url),
        }
    }
}

/// Person fields joined onto a user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonBrief {
    pub name: String,
    pub phone: String,
}

/// Row of the user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub profile: i32,
    pub created_at: DateTime<Utc>,
    pub person: PersonBrief,
}

#[async_trait]
pub trait PersonRepository: Send + Sync {
    /// One page, ordered by name.
    async fn list(&self, page: PageRequest) -> Result<Vec<Person>, StoreError>;
    async fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError>;
    async fn find_by_document(&self, document: &str) -> Result<Option<Person>, StoreError>;
    async fn insert(&self, person: &Person) -> Result<(), StoreError>;
    async fn update(&self, person: &Person) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// One page, ordered by email, joined with the owning person.
    async fn list(&self, page: PageRequest) -> Result<Vec<UserSummary>, StoreError>;
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_person(&self, person_id: PersonId) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    async fn update(&self, user: &User) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn get(&self, id: FileId) -> Result<Option<StoredFile>, StoreError>;
    async fn insert(&self, file: &StoredFile) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> PersonRepository for Arc<S>
where
    S: PersonRepository + ?Sized,
{
    async fn list(&self, page: PageRequest) -> Result<Vec<Person>, StoreError> {
        (**self).list(page).await
    }

    async fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError> {
        (**self).get(id).await
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<Person>, StoreError> {
        (**self).find_by_document(document).await
    }

    async fn insert(&self, person: &Person) -> Result<(), StoreError> {
        (**self).insert(person).await
    }

    async fn update(&self, person: &Person) -> Result<(), StoreError> {
        (**self).update(person).await
    }
}

#[async_trait]
impl<S> UserRepository for Arc<S>
where
    S: UserRepository + ?Sized,
{
    async fn list(&self, page: PageRequest) -> Result<Vec<UserSummary>, StoreError> {
        (**self).list(page).await
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).get(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn find_by_person(&self, person_id: PersonId) -> Result<Option<User>, StoreError> {
        (**self).find_by_person(person_id).await
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        (**self).insert(user).await
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        (**self).update(user).await
    }
}
