//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, resolver chain, dispatcher and workers
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request bodies and query strings
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use warden_auth::Hs256JwtValidator;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, StartupError};

/// Router plus the services behind it, so the caller can shut workers down.
pub struct Application {
    pub router: Router,
    pub services: Arc<AppServices>,
}

/// Build the full HTTP application (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Application, StartupError> {
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(config).await?);

    let router = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::identity_middleware,
            ))
            .layer(Extension(services.clone())),
    );

    Ok(Application { router, services })
}
