use serde::{Deserialize, Serialize};

use rollcall_auth::{AvatarFile, User, UserChangeRequest};
use rollcall_core::{FileId, PersonId, UserId};
use rollcall_people::PersonChangeRequest;

// -------------------------
// Request DTOs
// -------------------------

/// Fields are optional so that a missing field is a domain validation error,
/// not an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePersonRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
}

impl From<UpdatePersonRequest> for PersonChangeRequest {
    fn from(body: UpdatePersonRequest) -> Self {
        Self {
            name: body.name,
            phone: body.phone,
            document: body.document,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub profile: Option<i32>,
    pub avatar_id: Option<String>,
    #[serde(rename = "oldPassword")]
    pub old_password: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
}

impl UpdateUserRequest {
    /// Fails only when `avatar_id` is not a valid file id.
    pub fn into_change_request(self) -> Result<UserChangeRequest, String> {
        let avatar_id = self
            .avatar_id
            .map(|raw| raw.parse::<FileId>().map_err(|e| e.to_string()))
            .transpose()?;

        Ok(UserChangeRequest {
            email: self.email,
            profile: self.profile,
            avatar_id,
            old_password: self.old_password,
            password: self.password,
            confirm_password: self.confirm_password,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub email: String,
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: UserId,
    pub person_id: PersonId,
    pub email: String,
    pub profile: i32,
}

impl From<&User> for CreatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            person_id: user.person_id,
            email: user.email.clone(),
            profile: user.profile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdatedUser {
    pub id: UserId,
    /// Name of the owning person.
    pub name: Option<String>,
    pub email: String,
    pub profile: i32,
    pub avatar: Option<AvatarFile>,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub profile: i32,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub token: String,
}
