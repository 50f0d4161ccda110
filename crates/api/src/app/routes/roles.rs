use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};

use warden_auth::RequestIdentity;
use warden_directory::operations::{
    CreateRole, DeleteRole, GetRole, GrantPermissionToRole, ListRoles, RevokePermissionFromRole,
};

use crate::app::dto;
use crate::app::routes::common::{dispatch_empty, dispatch_items, dispatch_json, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_role).get(list_roles))
        .route("/:id", get(get_role).delete(delete_role))
        .route("/:id/permissions", post(grant_permission))
        .route("/:id/permissions/:permission_id", delete(revoke_permission))
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(body): Json<CreateRole>,
) -> Response {
    dispatch_json(&services, &identity, body, StatusCode::CREATED).await
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    dispatch_items(&services, &identity, ListRoles).await
}

pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let role_id = match parse_id(&id, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_json(&services, &identity, GetRole { role_id }, StatusCode::OK).await
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let role_id = match parse_id(&id, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_empty(&services, &identity, DeleteRole { role_id }).await
}

pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    Json(body): Json<dto::GrantPermissionRequest>,
) -> Response {
    let role_id = match parse_id(&id, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let op = GrantPermissionToRole {
        role_id,
        permission_id: body.permission_id,
    };
    dispatch_json(&services, &identity, op, StatusCode::CREATED).await
}

pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path((id, permission_id)): Path<(String, String)>,
) -> Response {
    let (role_id, permission_id) = match (parse_id(&id, "role"), parse_id(&permission_id, "permission")) {
        (Ok(r), Ok(p)) => (r, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let op = RevokePermissionFromRole {
        role_id,
        permission_id,
    };
    dispatch_empty(&services, &identity, op).await
}
