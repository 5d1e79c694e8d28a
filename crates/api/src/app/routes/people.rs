use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use rollcall_auth::Capability;
use rollcall_core::{PageQuery, PersonId};
use rollcall_people::{NewPerson, Person, PersonPatch, ValidationIssue};

use crate::app::dto;
use crate::app::errors::{self, ApiError};
use crate::app::routes::common::{json_body, page_request};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_people).post(create_person))
        .route("/:id", get(show_person).put(update_person))
}

pub async fn list_people(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Person>>, ApiError> {
    authz::require(&principal, Capability::ListPeople)?;
    let page = page_request(query)?;

    let people = services.people.list(page).await?;
    Ok(Json(people))
}

pub async fn create_person(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreatePersonRequest>, JsonRejection>,
) -> Result<Json<Person>, ApiError> {
    let missing = || ApiError::rejected(StatusCode::UNAUTHORIZED, errors::PERSON_FIELDS_MISSING);

    let body = json_body(body, missing())?;
    let new = NewPerson::validate(body.name, body.phone, body.document).map_err(|e| {
        tracing::debug!(reason = %e, "person rejected");
        missing()
    })?;

    if services.people.find_by_document(&new.document).await?.is_some() {
        tracing::info!(user_id = %principal.user_id(), "duplicate person document");
        return Err(ApiError::rejected(
            StatusCode::UNAUTHORIZED,
            errors::PERSON_EXISTS,
        ));
    }

    let person = Person::register(new, Utc::now());
    services.people.insert(&person).await?;

    tracing::info!(person_id = %person.id, user_id = %principal.user_id(), "person created");
    Ok(Json(person))
}

/// Absent people are reported as `null` with 200.
pub async fn show_person(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Person>>, ApiError> {
    let id: PersonId = id.parse().map_err(|_| ApiError::invalid_id())?;
    let person = services.people.get(id).await?;
    Ok(Json(person))
}

pub async fn update_person(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdatePersonRequest>, JsonRejection>,
) -> Result<Json<Person>, ApiError> {
    authz::require(&principal, Capability::UpdatePerson)?;
    let id: PersonId = id.parse().map_err(|_| ApiError::invalid_id())?;

    let mut person = services
        .people
        .get(id)
        .await?
        .ok_or_else(|| ApiError::rejected(StatusCode::NOT_FOUND, errors::PERSON_NOT_FOUND))?;

    let body = json_body(body, ApiError::Invalid(ValidationIssue::malformed_body()))?;
    let patch = PersonPatch::validate(body.into()).map_err(ApiError::Invalid)?;

    if let Some(document) = person.document_change(&patch) {
        if let Some(other) = services.people.find_by_document(document).await? {
            if other.id != person.id {
                return Err(ApiError::Invalid(ValidationIssue::unique("document", document)));
            }
        }
    }

    person.apply(patch, Utc::now());
    services.people.update(&person).await?;

    tracing::info!(person_id = %person.id, user_id = %principal.user_id(), "person updated");
    Ok(Json(person))
}
