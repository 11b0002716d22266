use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::services::audit;
use crate::application::use_cases::permissions::create_permission::{
    CreatePermission, CreatePermissionRequest,
};
use crate::application::use_cases::permissions::delete_permission::DeletePermission;
use crate::application::use_cases::permissions::list_permissions::ListPermissions;
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::access::role::Permission;
use crate::domain::activity::activity_log::NewActivity;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionResponse {
    pub id: Uuid,
    pub action: Action,
    pub subject: Subject,
    /// Deny rule when true
    pub inverted: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Permission> for PermissionResponse {
    fn from(p: Permission) -> Self {
        Self {
            id: p.id,
            action: p.action,
            subject: p.subject,
            inverted: p.inverted,
            description: p.description,
            created_at: p.created_at,
        }
    }
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/permissions", get(list_permissions).post(create_permission))
        .route("/permissions/:id", delete(delete_permission))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/permissions", tag = "Permissions",
    responses((status = 200, body = [PermissionResponse])))]
pub async fn list_permissions(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    principal.require(Action::Read, Subject::Permission)?;
    let permissions = ctx.permission_repo();
    let list = ListPermissions {
        permissions: permissions.as_ref(),
    }
    .execute()
    .await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/permissions", tag = "Permissions", request_body = CreatePermissionRequest,
    responses((status = 201, body = PermissionResponse), (status = 409, body = ErrorBody)))]
pub async fn create_permission(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<CreatePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    principal.require(Action::Create, Subject::Permission)?;
    let permissions = ctx.permission_repo();
    let permission = CreatePermission {
        permissions: permissions.as_ref(),
    }
    .execute(&req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "create", "Permission")
            .with_subject_id(permission.id)
            .with_metadata(json!({
                "action": permission.action,
                "subject": permission.subject,
                "inverted": permission.inverted,
            }))
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(permission.into())))
}

#[utoipa::path(delete, path = "/api/permissions/{id}", tag = "Permissions",
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn delete_permission(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(Action::Delete, Subject::Permission)?;
    let permissions = ctx.permission_repo();
    DeletePermission {
        permissions: permissions.as_ref(),
    }
    .execute(id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "delete", "Permission")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
