use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::services::audit;
use crate::application::use_cases::roles::create_role::{CreateRole, CreateRoleRequest};
use crate::application::use_cases::roles::delete_role::DeleteRole;
use crate::application::use_cases::roles::get_role::{GetRole, ListRoles};
use crate::application::use_cases::roles::update_role::{UpdateRole, UpdateRoleRequest};
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::access::role::Role;
use crate::domain::activity::activity_log::NewActivity;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};
use crate::presentation::http::permissions::PermissionResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// System roles cannot be renamed or deleted
    pub is_system: bool,
    pub permissions: Vec<PermissionResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            is_system: r.is_system,
            permissions: r.permissions.into_iter().map(Into::into).collect(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/:id",
            get(get_role).patch(update_role).delete(delete_role),
        )
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/roles", tag = "Roles", responses((status = 200, body = [RoleResponse])))]
pub async fn list_roles(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    principal.require(Action::Read, Subject::Role)?;
    let roles = ctx.role_repo();
    let list = ListRoles {
        roles: roles.as_ref(),
    }
    .execute()
    .await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/roles", tag = "Roles", request_body = CreateRoleRequest,
    responses((status = 201, body = RoleResponse), (status = 409, body = ErrorBody)))]
pub async fn create_role(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    principal.require(Action::Create, Subject::Role)?;
    let roles = ctx.role_repo();
    let permissions = ctx.permission_repo();
    let role = CreateRole {
        roles: roles.as_ref(),
        permissions: permissions.as_ref(),
    }
    .execute(&req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "create", "Role")
            .with_subject_id(role.id)
            .with_metadata(json!({ "name": role.name }))
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(role.into())))
}

#[utoipa::path(get, path = "/api/roles/{id}", tag = "Roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, body = RoleResponse), (status = 404, body = ErrorBody)))]
pub async fn get_role(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    principal.require(Action::Read, Subject::Role)?;
    let roles = ctx.role_repo();
    let role = GetRole {
        roles: roles.as_ref(),
    }
    .execute(id)
    .await?;
    Ok(Json(role.into()))
}

#[utoipa::path(patch, path = "/api/roles/{id}", tag = "Roles", request_body = UpdateRoleRequest,
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, body = RoleResponse), (status = 403, body = ErrorBody)))]
pub async fn update_role(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    principal.require(Action::Update, Subject::Role)?;
    let roles = ctx.role_repo();
    let permissions = ctx.permission_repo();
    let role = UpdateRole {
        roles: roles.as_ref(),
        permissions: permissions.as_ref(),
    }
    .execute(id, &req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "update", "Role")
            .with_subject_id(id)
            .with_metadata(json!({ "permission_ids": req.permission_ids }))
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(role.into()))
}

#[utoipa::path(delete, path = "/api/roles/{id}", tag = "Roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 204), (status = 403, description = "System role", body = ErrorBody)))]
pub async fn delete_role(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(Action::Delete, Subject::Role)?;
    let roles = ctx.role_repo();
    DeleteRole {
        roles: roles.as_ref(),
    }
    .execute(id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "delete", "Role")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
