use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use warden_auth::{RequestIdentity, Role};
use warden_core::UserId;
use warden_directory::operations::{ExplainDecision, Health, WhoAmI};

use crate::app::routes::common::{dispatch_json, parse_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn health(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    dispatch_json(&services, &identity, Health, StatusCode::OK).await
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    dispatch_json(&services, &identity, WhoAmI, StatusCode::OK).await
}

/// `GET /authz/explain/:operation`: how the gate would decide `operation`.
///
/// The subject is the caller unless `user_id` (and optionally `roles`) name
/// another identity, which always lives in the caller's tenant.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(operation): Path<String>,
    Query(query): Query<dto::ExplainQuery>,
) -> Response {
    let subject = match subject_from_query(&identity, &query) {
        Ok(subject) => subject,
        Err(resp) => return resp,
    };

    let request = ExplainDecision { operation, subject };
    match services.dispatcher.explain(&identity, request).await {
        Ok(explanation) => (StatusCode::OK, Json(explanation)).into_response(),
        Err(err) => errors::dispatch_error_to_response(err, services.expose_unmet_requirement),
    }
}

fn subject_from_query(
    caller: &RequestIdentity,
    query: &dto::ExplainQuery,
) -> Result<RequestIdentity, Response> {
    let Some(raw) = query.user_id.as_deref() else {
        return Ok(caller.clone());
    };
    let user_id: UserId = parse_id(raw, "user")?;

    let roles = query
        .roles
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| Role::new(r.to_string()))
        .collect();

    Ok(RequestIdentity::new(Some(user_id), caller.tenant_id(), roles))
}
