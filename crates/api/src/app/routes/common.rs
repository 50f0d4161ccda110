use std::str::FromStr;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use warden_auth::{Operation, RequestIdentity};
use warden_infra::OperationHandler;

use crate::app::errors;
use crate::app::services::{AppServices, Handler};

/// Dispatch `operation` and render its output as JSON with `status`.
pub async fn dispatch_json<O>(
    services: &AppServices,
    identity: &RequestIdentity,
    operation: O,
    status: StatusCode,
) -> Response
where
    O: Operation,
    O::Output: Serialize,
    Handler: OperationHandler<O>,
{
    match services.dispatcher.dispatch(identity, operation).await {
        Ok(output) => (status, Json(output)).into_response(),
        Err(err) => errors::dispatch_error_to_response(err, services.expose_unmet_requirement),
    }
}

/// Dispatch a list query and render `{ "items": [...] }`.
pub async fn dispatch_items<O, T>(
    services: &AppServices,
    identity: &RequestIdentity,
    operation: O,
) -> Response
where
    O: Operation<Output = Vec<T>>,
    T: Serialize + Send,
    Handler: OperationHandler<O>,
{
    match services.dispatcher.dispatch(identity, operation).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(err) => errors::dispatch_error_to_response(err, services.expose_unmet_requirement),
    }
}

/// Dispatch an operation without output and answer 204.
pub async fn dispatch_empty<O>(
    services: &AppServices,
    identity: &RequestIdentity,
    operation: O,
) -> Response
where
    O: Operation<Output = ()>,
    Handler: OperationHandler<O>,
{
    match services.dispatcher.dispatch(identity, operation).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::dispatch_error_to_response(err, services.expose_unmet_requirement),
    }
}

pub fn parse_id<T: FromStr>(raw: &str, what: &'static str) -> Result<T, Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}
