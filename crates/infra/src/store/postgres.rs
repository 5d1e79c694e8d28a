//! Postgres-backed people/users/files store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Database` (tagged `unique violation`) |
//! | Database (foreign key violation) | `23503` | `Database` (tagged `foreign key violation`) |
//! | Database (other) | Any other | `Database` |
//! | ColumnDecode / ColumnNotFound | N/A | `Corrupt` |
//! | Other | N/A | `Database` |

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use rollcall_auth::{PasswordHash, User};
use rollcall_core::{FileId, PageRequest, PersonId, UserId};
use rollcall_people::Person;

use super::{
    FileRepository, PersonBrief, PersonRepository, StoreError, StoredFile, UserRepository,
    UserSummary,
};

const SCHEMA: &str = include_str!("schema.sql");

/// Postgres-backed store for the relational tables.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes when missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl PersonRepository for PgStore {
    #[instrument(skip(self), fields(page = page.page()))]
    async fn list(&self, page: PageRequest) -> Result<Vec<Person>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, phone, document, created_at, updated_at
            FROM people
            ORDER BY name ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_people", e))?;

        rows.iter().map(person_from_row).collect()
    }

    #[instrument(skip(self), fields(person_id = %id))]
    async fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, document, created_at, updated_at
            FROM people
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_person", e))?;

        row.as_ref().map(person_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_document(&self, document: &str) -> Result<Option<Person>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, document, created_at, updated_at
            FROM people
            WHERE document = $1
            LIMIT 1
            "#,
        )
        .bind(document)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_person_by_document", e))?;

        row.as_ref().map(person_from_row).transpose()
    }

    #[instrument(skip(self, person), fields(person_id = %person.id))]
    async fn insert(&self, person: &Person) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO people (id, name, phone, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*person.id.as_uuid())
        .bind(&person.name)
        .bind(&person.phone)
        .bind(&person.document)
        .bind(person.created_at)
        .bind(person.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_person", e))?;
        Ok(())
    }

    #[instrument(skip(self, person), fields(person_id = %person.id))]
    async fn update(&self, person: &Person) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE people
            SET name = $2, phone = $3, document = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(*person.id.as_uuid())
        .bind(&person.name)
        .bind(&person.phone)
        .bind(&person.document)
        .bind(person.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_person", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    #[instrument(skip(self), fields(page = page.page()))]
    async fn list(&self, page: PageRequest) -> Result<Vec<UserSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.profile, u.created_at,
                   p.name AS person_name, p.phone AS person_phone
            FROM users u
            JOIN people p ON p.id = u.person_id
            ORDER BY u.email ASC, u.id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter()
            .map(|row| {
                Ok(UserSummary {
                    id: UserId::from_uuid(column(row, "id")?),
                    email: column(row, "email")?,
                    profile: column(row, "profile")?,
                    created_at: column(row, "created_at")?,
                    person: PersonBrief {
                        name: column(row, "person_name")?,
                        phone: column(row, "person_phone")?,
                    },
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_user("get_user", "id = $1", *id.as_uuid()).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&user_select("email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(person_id = %person_id))]
    async fn find_by_person(&self, person_id: PersonId) -> Result<Option<User>, StoreError> {
        self.fetch_user("find_user_by_person", "person_id = $1", *person_id.as_uuid())
            .await
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, person_id, email, password_hash, profile, avatar_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(*user.person_id.as_uuid())
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .bind(user.profile)
        .bind(user.avatar_id.map(|id| *id.as_uuid()))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, profile = $4, avatar_id = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .bind(user.profile)
        .bind(user.avatar_id.map(|id| *id.as_uuid()))
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(())
    }
}

impl PgStore {
    async fn fetch_user(
        &self,
        operation: &str,
        predicate: &str,
        key: Uuid,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&user_select(predicate))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl FileRepository for PgStore {
    #[instrument(skip(self), fields(file_id = %id))]
    async fn get(&self, id: FileId) -> Result<Option<StoredFile>, StoreError> {
        let row = sqlx::query("SELECT id, name, path FROM files WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_file", e))?;

        row.as_ref()
            .map(|row| {
                Ok(StoredFile {
                    id: FileId::from_uuid(column(row, "id")?),
                    name: column(row, "name")?,
                    path: column(row, "path")?,
                })
            })
            .transpose()
    }

    #[instrument(skip(self, file), fields(file_id = %file.id))]
    async fn insert(&self, file: &StoredFile) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO files (id, name, path) VALUES ($1, $2, $3)")
            .bind(*file.id.as_uuid())
            .bind(&file.name)
            .bind(&file.path)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_file", e))?;
        Ok(())
    }
}

fn user_select(predicate: &str) -> String {
    format!(
        "SELECT id, person_id, email, password_hash, profile, avatar_id, created_at, updated_at \
         FROM users WHERE {predicate} LIMIT 1"
    )
}

fn offset(page: PageRequest) -> i64 {
    i64::try_from(page.offset()).unwrap_or(i64::MAX)
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<T, _>(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn person_from_row(row: &PgRow) -> Result<Person, StoreError> {
    Ok(Person {
        id: PersonId::from_uuid(column(row, "id")?),
        name: column(row, "name")?,
        phone: column(row, "phone")?,
        document: column(row, "document")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let avatar_id: Option<Uuid> = column(row, "avatar_id")?;
    Ok(User {
        id: UserId::from_uuid(column(row, "id")?),
        person_id: PersonId::from_uuid(column(row, "person_id")?),
        email: column(row, "email")?,
        password_hash: PasswordHash::from_stored(column::<String>(row, "password_hash")?),
        profile: column(row, "profile")?,
        avatar_id: avatar_id.map(FileId::from_uuid),
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Database(format!("unique violation: {msg}")),
                Some("23503") => StoreError::Database(format!("foreign key violation: {msg}")),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("{operation}: {err}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("{operation}: {other}")),
    }
}
