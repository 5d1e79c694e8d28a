use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;

use rollcall_auth::JwtClaims;

use crate::app::dto;
use crate::app::errors::{self, ApiError};
use crate::app::routes::common::json_body;
use crate::app::services::AppServices;

fn invalid_credentials() -> ApiError {
    ApiError::rejected(StatusCode::UNAUTHORIZED, errors::INVALID_CREDENTIALS)
}

/// Exchange email + password for a bearer token.
pub async fn create_session(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SessionRequest>, JsonRejection>,
) -> Result<Json<dto::SessionResponse>, ApiError> {
    let body = json_body(body, invalid_credentials())?;
    let email = body.email.trim().to_lowercase();

    let Some(user) = services.users.find_by_email(&email).await? else {
        tracing::info!("login for unknown email");
        return Err(invalid_credentials());
    };

    let matches = services
        .verify_password(body.password, user.password_hash.clone())
        .await?;
    if !matches {
        tracing::info!(user_id = %user.id, "login with wrong password");
        return Err(invalid_credentials());
    }

    let claims = JwtClaims::new(user.id, user.profile, Utc::now(), services.config.token_ttl);
    let token = services.issuer.issue(&claims)?;

    tracing::info!(user_id = %user.id, "session issued");
    Ok(Json(dto::SessionResponse {
        user: dto::SessionUser {
            id: user.id,
            email: user.email,
            profile: user.profile,
        },
        token,
    }))
}
