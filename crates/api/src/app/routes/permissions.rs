use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, post},
    Json, Router,
};

use warden_auth::RequestIdentity;
use warden_directory::operations::{CreatePermission, DeletePermission, ListPermissions};

use crate::app::routes::common::{dispatch_empty, dispatch_items, dispatch_json, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_permission).get(list_permissions))
        .route("/:id", delete(delete_permission))
}

pub async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(body): Json<CreatePermission>,
) -> Response {
    dispatch_json(&services, &identity, body, StatusCode::CREATED).await
}

pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    dispatch_items(&services, &identity, ListPermissions).await
}

pub async fn delete_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let permission_id = match parse_id(&id, "permission") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_empty(&services, &identity, DeletePermission { permission_id }).await
}
