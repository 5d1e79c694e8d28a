use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use rollcall_audit::AuditError;
use rollcall_auth::{JwtError, PasswordError};
use rollcall_infra::StoreError;
use rollcall_people::ValidationIssue;

// Client-facing messages. Status codes are per endpoint, so handlers pair
// these with a status through `ApiError::rejected`.
pub const NO_PERMISSION: &str = "User does not have permission";
pub const INVALID_PAGE: &str = "Invalid page";
pub const INVALID_ID: &str = "Invalid id";
pub const PERSON_FIELDS_MISSING: &str = "Validation fail. Some required field is missing";
pub const PERSON_EXISTS: &str = "Person already exists.";
pub const PERSON_NOT_FOUND: &str = "Person not found";
pub const USER_FIELDS_MISSING: &str = "Validation fail. Some field is missing.";
pub const EMAIL_EXISTS: &str = "Email already exists.";
pub const PERSON_HAS_USER: &str = "Person already has a user.";
pub const USER_NOT_FOUND: &str = "User not found";
pub const USER_EXISTS: &str = "User already exists.";
pub const PASSWORD_MISMATCH: &str = "Password does not match";
pub const AVATAR_NOT_FOUND: &str = "Avatar not found";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const DOWNSTREAM_FAILURE: &str = "Error occurred. Contact the system manager";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User does not have permission")]
    Forbidden,

    #[error("{message}")]
    Rejected {
        status: StatusCode,
        message: &'static str,
    },

    /// Field-level validation failure; only the first issue is reported.
    #[error("{}", .0.message)]
    Invalid(ValidationIssue),

    /// A store, audit log or hashing failure. Logged, never shown to clients.
    #[error("downstream failure: {0}")]
    Downstream(String),
}

impl ApiError {
    pub fn rejected(status: StatusCode, message: &'static str) -> Self {
        Self::Rejected { status, message }
    }

    pub fn invalid_page() -> Self {
        Self::rejected(StatusCode::BAD_REQUEST, INVALID_PAGE)
    }

    pub fn invalid_id() -> Self {
        Self::rejected(StatusCode::BAD_REQUEST, INVALID_ID)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Downstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Forbidden => json_error(status, NO_PERMISSION),
            ApiError::Rejected { message, .. } => json_error(status, message),
            ApiError::Invalid(issue) => (status, axum::Json(issue)).into_response(),
            ApiError::Downstream(detail) => {
                tracing::error!(error = %detail, "request failed downstream");
                json_error(status, DOWNSTREAM_FAILURE)
            }
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
        })),
    )
        .into_response()
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Downstream(err.to_string())
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        ApiError::Downstream(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Downstream(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Downstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_variant() {
        assert_eq!(ApiError::Forbidden.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::rejected(StatusCode::UNAUTHORIZED, PERSON_EXISTS).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Downstream("boom".to_string()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn display_uses_the_client_message() {
        assert_eq!(ApiError::Forbidden.to_string(), NO_PERMISSION);
        assert_eq!(ApiError::invalid_page().to_string(), INVALID_PAGE);
        let issue = ValidationIssue::not_empty("name", "");
        assert_eq!(
            ApiError::Invalid(issue).to_string(),
            "Validation notEmpty on name failed"
        );
    }

    #[test]
    fn store_errors_become_downstream_failures() {
        let err: ApiError = StoreError::Poisoned.into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
