use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};

use warden_auth::RequestIdentity;
use warden_core::UserId;
use warden_directory::operations::{
    ActivateUser, AssignRoleToUser, CreateUser, DeleteUser, GetUser, GrantPermissionToUser,
    ListUsers, RevokePermissionFromUser, RevokeRoleFromUser, SuspendUser,
};

use crate::app::dto;
use crate::app::routes::common::{dispatch_empty, dispatch_items, dispatch_json, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", get(get_user).delete(delete_user))
        .route("/:id/suspend", post(suspend_user))
        .route("/:id/activate", post(activate_user))
        .route("/:id/roles", post(assign_role))
        .route("/:id/roles/:role_id", delete(revoke_role))
        .route("/:id/permissions", post(grant_permission))
        .route("/:id/permissions/:permission_id", delete(revoke_permission))
}

fn user_id(raw: &str) -> Result<UserId, Response> {
    parse_id(raw, "user")
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(body): Json<CreateUser>,
) -> Response {
    dispatch_json(&services, &identity, body, StatusCode::CREATED).await
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    dispatch_items(&services, &identity, ListUsers).await
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_json(&services, &identity, GetUser { user_id }, StatusCode::OK).await
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_empty(&services, &identity, DeleteUser { user_id }).await
}

pub async fn suspend_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_json(&services, &identity, SuspendUser { user_id }, StatusCode::OK).await
}

pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_json(&services, &identity, ActivateUser { user_id }, StatusCode::OK).await
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> Response {
    let user_id = match user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let op = AssignRoleToUser {
        user_id,
        role_id: body.role_id,
    };
    dispatch_json(&services, &identity, op, StatusCode::CREATED).await
}

pub async fn revoke_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path((id, role_id)): Path<(String, String)>,
) -> Response {
    let (user_id, role_id) = match (user_id(&id), parse_id(&role_id, "role")) {
        (Ok(u), Ok(r)) => (u, r),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    dispatch_empty(&services, &identity, RevokeRoleFromUser { user_id, role_id }).await
}

pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    Json(body): Json<dto::GrantPermissionRequest>,
) -> Response {
    let user_id = match user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let op = GrantPermissionToUser {
        user_id,
        permission_id: body.permission_id,
    };
    dispatch_json(&services, &identity, op, StatusCode::CREATED).await
}

pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path((id, permission_id)): Path<(String, String)>,
) -> Response {
    let (user_id, permission_id) = match (user_id(&id), parse_id(&permission_id, "permission")) {
        (Ok(u), Ok(p)) => (u, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let op = RevokePermissionFromUser {
        user_id,
        permission_id,
    };
    dispatch_empty(&services, &identity, op).await
}
