use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use warden_auth::{AuthzError, FailureKind};
use warden_infra::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError, expose_unmet: bool) -> Response {
    match err {
        DispatchError::Authz(e) => authz_error_to_response(&e, expose_unmet),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        DispatchError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::TenantIsolation(msg) => {
            json_error(StatusCode::FORBIDDEN, "tenant_isolation", msg)
        }
        DispatchError::Store(e) => {
            tracing::error!(error = %e, "directory store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "directory store unavailable",
            )
        }
    }
}

/// 401 and 403 bodies carry no message; the unmet requirement is only
/// included when explicitly enabled.
pub fn authz_error_to_response(err: &AuthzError, expose_unmet: bool) -> Response {
    match err.kind() {
        FailureKind::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            axum::Json(json!({ "error": "unauthenticated" })),
        )
            .into_response(),
        FailureKind::ForbiddenRole | FailureKind::ForbiddenPermission => {
            let body = match err.unmet().filter(|_| expose_unmet) {
                Some(unmet) => json!({ "error": "forbidden", "unmet": unmet }),
                None => json!({ "error": "forbidden" }),
            };
            (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
        }
        FailureKind::Misconfigured => {
            tracing::error!(error = %err, "operation reached the gate without registration");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "misconfigured",
                "operation is not registered",
            )
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
