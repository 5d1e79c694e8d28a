use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::{JsonRejection, QueryRejection};

use rollcall_core::{PageQuery, PageRequest};
use rollcall_infra::ConflictPolicy;

use crate::app::errors::ApiError;

/// Tracks uniqueness/password conflicts detected while a handler runs.
///
/// Under `Strict` the first conflict is returned at once. Under `Observed`
/// it is remembered and becomes the response once the handler has finished
/// its writes.
#[derive(Debug)]
pub struct Conflicts {
    policy: ConflictPolicy,
    first: Option<ApiError>,
}

impl Conflicts {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            first: None,
        }
    }

    pub fn detect(&mut self, conflict: ApiError) -> Result<(), ApiError> {
        tracing::info!(reason = %conflict, policy = ?self.policy, "conflict detected");
        if self.policy.halts() {
            return Err(conflict);
        }
        if self.first.is_none() {
            self.first = Some(conflict);
        }
        Ok(())
    }

    pub fn finish<T>(self, response: T) -> Result<T, ApiError> {
        match self.first {
            Some(conflict) => Err(conflict),
            None => Ok(response),
        }
    }
}

/// Unwrap a JSON body, turning a malformed body into `on_error`.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>, on_error: ApiError) -> Result<T, ApiError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "malformed request body");
            Err(on_error)
        }
    }
}

/// Turn `?page=` into a page request. Any unreadable query is `Invalid page`.
pub fn page_request(query: Result<Query<PageQuery>, QueryRejection>) -> Result<PageRequest, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "malformed query string");
        ApiError::invalid_page()
    })?;
    query.into_request().map_err(|_| ApiError::invalid_page())
}
