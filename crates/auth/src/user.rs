//! User account model.
//!
//! A user is the login attached to exactly one person. Validation rules for
//! account creation and updates live here so the HTTP layer only maps them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, DomainResult, FileId, PersonId, UserId};

use crate::PasswordHash;

/// Minimum accepted password length (characters).
pub const MIN_PASSWORD_LEN: usize = 6;

/// Profile level assigned when a create request omits one.
pub const DEFAULT_PROFILE: i32 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Avatar
// ─────────────────────────────────────────────────────────────────────────────

/// Stored file referenced as a user's avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarFile {
    pub id: FileId,
    pub path: String,
    pub url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// User account.
///
/// # Invariants
/// - `email` is unique across users (checked before writes, not by the store).
/// - `person_id` is unique across users (one account per person).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub person_id: PersonId,
    pub email: String,
    pub password_hash: PasswordHash,
    pub profile: i32,
    pub avatar_id: Option<FileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn register(
        person_id: PersonId,
        cmd: CreateUser,
        password_hash: PasswordHash,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            person_id,
            email: cmd.email,
            password_hash,
            profile: cmd.profile,
            avatar_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The requested email when it differs from the current one.
    pub fn email_change<'a>(&self, changes: &'a UpdateUser) -> Option<&'a str> {
        changes
            .email
            .as_deref()
            .filter(|email| *email != self.email)
    }

    /// Apply validated changes. `password_hash` is the hash of
    /// `changes.password`, computed by the caller.
    pub fn apply(
        &mut self,
        changes: &UpdateUser,
        password_hash: Option<PasswordHash>,
        now: DateTime<Utc>,
    ) {
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(profile) = changes.profile {
            self.profile = profile;
        }
        if let Some(avatar_id) = changes.avatar_id {
            self.avatar_id = Some(avatar_id);
        }
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
        self.updated_at = now;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

/// Validated account creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub profile: i32,
}

impl CreateUser {
    pub fn validate(
        email: Option<String>,
        password: Option<String>,
        profile: Option<i32>,
    ) -> DomainResult<Self> {
        let email = email
            .map(|e| normalize_email(&e))
            .ok_or_else(|| DomainError::validation("email is required"))?;
        if !is_valid_email(&email) {
            return Err(DomainError::validation("email must be a valid email"));
        }

        let password = password.ok_or_else(|| DomainError::validation("password is required"))?;
        check_password_len("password", &password)?;

        Ok(Self {
            email,
            password,
            profile: profile.unwrap_or(DEFAULT_PROFILE),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Raw update fields as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChangeRequest {
    pub email: Option<String>,
    pub profile: Option<i32>,
    pub avatar_id: Option<FileId>,
    pub old_password: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Validated account update.
///
/// `confirm_password` has been checked and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub profile: Option<i32>,
    pub avatar_id: Option<FileId>,
    pub old_password: Option<String>,
    pub password: Option<String>,
}

impl UpdateUser {
    /// Conditional schema:
    /// - `password` is required once `old_password` is given;
    /// - `confirm_password` is required and must equal `password` once
    ///   `password` is given.
    pub fn validate(req: UserChangeRequest) -> DomainResult<Self> {
        let email = req.email.map(|e| normalize_email(&e));
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(DomainError::validation("email must be a valid email"));
            }
        }

        if let Some(old) = &req.old_password {
            check_password_len("oldPassword", old)?;
            if req.password.is_none() {
                return Err(DomainError::validation(
                    "password is required when oldPassword is given",
                ));
            }
        }

        if let Some(password) = &req.password {
            check_password_len("password", password)?;
            match &req.confirm_password {
                None => {
                    return Err(DomainError::validation(
                        "confirmPassword is required when password is given",
                    ));
                }
                Some(confirm) if confirm != password => {
                    return Err(DomainError::validation(
                        "confirmPassword must match password",
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            email,
            profile: req.profile,
            avatar_id: req.avatar_id,
            old_password: req.old_password,
            password: req.password,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password_len(field: &str, value: &str) -> DomainResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Basic shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}
