use axum::{routing::get, Router};

pub mod common;
pub mod permissions;
pub mod roles;
pub mod system;
pub mod tenants;
pub mod users;

/// Router for every endpoint. Authorization happens per operation in the
/// dispatcher, not per route.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/whoami", get(system::whoami))
        .route("/authz/explain/:operation", get(system::explain))
        .nest("/tenants", tenants::router())
        .nest("/users", users::router())
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
}
