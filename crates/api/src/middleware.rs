use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use warden_auth::{JwtValidator, RequestIdentity};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Attach a [`RequestIdentity`] to every request.
///
/// Requests without an `Authorization` header proceed anonymously and the
/// gate decides what they may do. A header that is present but not a valid
/// bearer token is rejected here with 401.
pub async fn identity_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = match extract_bearer(req.headers()) {
        Ok(None) => RequestIdentity::anonymous(),
        Ok(Some(token)) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => claims.into_identity(),
            Err(err) => {
                tracing::debug!(error = %err, "rejected bearer token");
                return unauthenticated();
            }
        },
        Err(()) => return unauthenticated(),
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({ "error": "unauthenticated" })),
    )
        .into_response()
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ()> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| ())?;
    let token = header.strip_prefix("Bearer ").ok_or(())?.trim();
    if token.is_empty() {
        return Err(());
    }

    Ok(Some(token))
}
