use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use rollcall_auth::User;
use rollcall_core::{FileId, PageRequest, PersonId, UserId};
use rollcall_people::Person;

use super::{
    FileRepository, PersonBrief, PersonRepository, StoreError, StoredFile, UserRepository,
    UserSummary,
};

/// In-memory people/users/files store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    people: RwLock<HashMap<PersonId, Person>>,
    users: RwLock<HashMap<UserId, User>>,
    files: RwLock<HashMap<FileId, StoredFile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersonRepository for InMemoryStore {
    async fn list(&self, page: PageRequest) -> Result<Vec<Person>, StoreError> {
        let map = self.people.read().map_err(|_| StoreError::Poisoned)?;
        let mut people: Vec<Person> = map.values().cloned().collect();
        people.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.slice(people))
    }

    async fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError> {
        let map = self.people.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<Person>, StoreError> {
        let map = self.people.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().find(|p| p.document == document).cloned())
    }

    async fn insert(&self, person: &Person) -> Result<(), StoreError> {
        let mut map = self.people.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(person.id, person.clone());
        Ok(())
    }

    async fn update(&self, person: &Person) -> Result<(), StoreError> {
        let mut map = self.people.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(person.id, person.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn list(&self, page: PageRequest) -> Result<Vec<UserSummary>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        let people = self.people.read().map_err(|_| StoreError::Poisoned)?;

        // Inner join: users whose person is gone are not listed.
        let mut rows: Vec<UserSummary> = users
            .values()
            .filter_map(|u| {
                let person = people.get(&u.person_id)?;
                Some(UserSummary {
                    id: u.id,
                    email: u.email.clone(),
                    profile: u.profile,
                    created_at: u.created_at,
                    person: PersonBrief {
                        name: person.name.clone(),
                        phone: person.phone.clone(),
                    },
                })
            })
            .collect();
        rows.sort_by(|a, b| a.email.cmp(&b.email).then(a.id.cmp(&b.id)));
        Ok(page.slice(rows))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let map = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let map = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_person(&self, person_id: PersonId) -> Result<Option<User>, StoreError> {
        let map = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().find(|u| u.person_id == person_id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut map = self.users.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut map = self.users.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl FileRepository for InMemoryStore {
    async fn get(&self, id: FileId) -> Result<Option<StoredFile>, StoreError> {
        let map = self.files.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    async fn insert(&self, file: &StoredFile) -> Result<(), StoreError> {
        let mut map = self.files.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(file.id, file.clone());
        Ok(())
    }
}
