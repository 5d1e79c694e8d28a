use axum::{Router, routing::get};

pub mod common;
pub mod people;
pub mod sessions;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/people", people::router())
        .nest("/users", users::router())
}
