use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use rollcall_auth::{Capability, CreateUser, UpdateUser, User};
use rollcall_core::{PageQuery, PersonId, UserId};
use rollcall_infra::UserSummary;

use crate::app::dto;
use crate::app::errors::{self, ApiError};
use crate::app::routes::common::{Conflicts, json_body, page_request};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        // `:id` is the owning person on create and the user on update.
        .route("/:id", post(create_user).put(update_user))
}

fn fields_missing() -> ApiError {
    ApiError::rejected(StatusCode::UNAUTHORIZED, errors::USER_FIELDS_MISSING)
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    authz::require(&principal, Capability::ListUsers)?;
    let page = page_request(query)?;

    let users = services.users.list(page).await?;
    Ok(Json(users))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(person_id): Path<String>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> Result<Json<dto::CreatedUser>, ApiError> {
    authz::require(&principal, Capability::CreateUser)?;
    let person_id: PersonId = person_id.parse().map_err(|_| ApiError::invalid_id())?;

    let body = json_body(body, fields_missing())?;
    let cmd = CreateUser::validate(body.email, body.password, body.profile).map_err(|e| {
        tracing::debug!(reason = %e, "user rejected");
        fields_missing()
    })?;

    let person = services
        .people
        .get(person_id)
        .await?
        .ok_or_else(|| ApiError::rejected(StatusCode::UNAUTHORIZED, errors::PERSON_NOT_FOUND))?;

    let mut conflicts = Conflicts::new(services.config.conflict_policy);
    if services.users.find_by_email(&cmd.email).await?.is_some() {
        conflicts.detect(ApiError::rejected(
            StatusCode::BAD_REQUEST,
            errors::EMAIL_EXISTS,
        ))?;
    }
    if services.users.find_by_person(person.id).await?.is_some() {
        conflicts.detect(ApiError::rejected(
            StatusCode::BAD_REQUEST,
            errors::PERSON_HAS_USER,
        ))?;
    }

    let password_hash = services.hash_password(cmd.password.clone()).await?;
    let now = Utc::now();
    let user = User::register(person.id, cmd, password_hash, now);
    services.users.insert(&user).await?;

    let entry = services
        .messages
        .user_created(principal.user_id(), &person.name, now);
    services.audit.append(entry).await?;

    tracing::info!(
        user_id = %user.id,
        person_id = %person.id,
        actor_id = %principal.user_id(),
        "user created"
    );
    conflicts.finish(Json(dto::CreatedUser::from(&user)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> Result<Json<dto::UpdatedUser>, ApiError> {
    authz::require(&principal, Capability::UpdateUser)?;
    let id: UserId = id.parse().map_err(|_| ApiError::invalid_id())?;

    let request = json_body(body, fields_missing())?
        .into_change_request()
        .map_err(|e| {
            tracing::debug!(reason = %e, "invalid avatar id");
            fields_missing()
        })?;
    let changes = UpdateUser::validate(request).map_err(|e| {
        tracing::debug!(reason = %e, "user update rejected");
        fields_missing()
    })?;

    let mut user = services
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::rejected(StatusCode::NOT_FOUND, errors::USER_NOT_FOUND))?;

    let mut conflicts = Conflicts::new(services.config.conflict_policy);
    if let Some(email) = user.email_change(&changes) {
        if services.users.find_by_email(email).await?.is_some() {
            conflicts.detect(ApiError::rejected(
                StatusCode::BAD_REQUEST,
                errors::USER_EXISTS,
            ))?;
        }
    }
    if let Some(old_password) = &changes.old_password {
        let matches = services
            .verify_password(old_password.clone(), user.password_hash.clone())
            .await?;
        if !matches {
            conflicts.detect(ApiError::rejected(
                StatusCode::UNAUTHORIZED,
                errors::PASSWORD_MISMATCH,
            ))?;
        }
    }

    if let Some(avatar_id) = changes.avatar_id {
        if services.files.get(avatar_id).await?.is_none() {
            return Err(ApiError::rejected(
                StatusCode::BAD_REQUEST,
                errors::AVATAR_NOT_FOUND,
            ));
        }
    }

    let new_hash = match &changes.password {
        Some(password) => Some(services.hash_password(password.clone()).await?),
        None => None,
    };

    let now = Utc::now();
    user.apply(&changes, new_hash, now);
    services.users.update(&user).await?;

    // Reload so the response reflects what was stored.
    let user = services
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::rejected(StatusCode::NOT_FOUND, errors::USER_NOT_FOUND))?;
    let person = services.people.get(user.person_id).await?;
    let avatar = match user.avatar_id {
        Some(file_id) => services
            .files
            .get(file_id)
            .await?
            .map(|file| file.avatar(&services.config.files_base_url)),
        None => None,
    };

    let entry = services
        .messages
        .user_updated(principal.user_id(), &user.email, now);
    services.audit.append(entry).await?;

    tracing::info!(user_id = %user.id, actor_id = %principal.user_id(), "user updated");
    conflicts.finish(Json(dto::UpdatedUser {
        id: user.id,
        name: person.map(|p| p.name),
        email: user.email,
        profile: user.profile,
        avatar,
    }))
}
