use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use warden_auth::RequestIdentity;
use warden_directory::operations::{CreateTenant, GetTenant, ListTenants};

use crate::app::routes::common::{dispatch_items, dispatch_json, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_tenant).get(list_tenants))
        .route("/:id", get(get_tenant))
}

pub async fn create_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(body): Json<CreateTenant>,
) -> Response {
    dispatch_json(&services, &identity, body, StatusCode::CREATED).await
}

pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    dispatch_items(&services, &identity, ListTenants).await
}

pub async fn get_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> Response {
    let tenant_id = match parse_id(&id, "tenant") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    dispatch_json(&services, &identity, GetTenant { tenant_id }, StatusCode::OK).await
}
