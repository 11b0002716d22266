use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::services::audit;
use crate::application::use_cases::users::create_user::{CreateUser, CreateUserRequest};
use crate::application::use_cases::users::delete_user::DeleteUser;
use crate::application::use_cases::users::get_user::GetUser;
use crate::application::use_cases::users::list_users::ListUsers;
use crate::application::use_cases::users::update_user::{UpdateUser, UpdateUserRequest};
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::users::user::User;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};
use crate::presentation::http::pagination::PageResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    /// Role names
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            is_active: u.is_active,
            roles: u.roles,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Matches email or name, case-insensitive
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/users", tag = "Users", params(ListUsersQuery),
    responses((status = 200, body = UserPage), (status = 403, body = ErrorBody)))]
pub async fn list_users(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Query(q): Query<ListUsersQuery>,
) -> ApiResult<Json<PageResponse<UserResponse>>> {
    principal.require(Action::Read, Subject::User)?;
    let users = ctx.user_repo();
    let page = ListUsers {
        users: users.as_ref(),
    }
    .execute(q.search.as_deref(), PageRequest::new(q.page, q.limit))
    .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(post, path = "/api/users", tag = "Users", request_body = CreateUserRequest,
    responses((status = 201, body = UserResponse), (status = 409, body = ErrorBody)))]
pub async fn create_user(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    principal.require(Action::Create, Subject::User)?;
    let users = ctx.user_repo();
    let roles = ctx.role_repo();
    let user = CreateUser {
        users: users.as_ref(),
        roles: roles.as_ref(),
    }
    .execute(&req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "create", "User")
            .with_subject_id(user.id)
            .with_metadata(json!({ "email": user.email }))
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(get, path = "/api/users/{id}", tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, body = UserResponse), (status = 404, body = ErrorBody)))]
pub async fn get_user(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    principal.require_owner_or(id, Action::Read, Subject::User)?;
    let users = ctx.user_repo();
    let user = GetUser {
        users: users.as_ref(),
    }
    .execute(id)
    .await?;
    Ok(Json(user.into()))
}

#[utoipa::path(patch, path = "/api/users/{id}", tag = "Users", request_body = UpdateUserRequest,
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, body = UserResponse), (status = 404, body = ErrorBody)))]
pub async fn update_user(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    principal.require(Action::Update, Subject::User)?;
    let users = ctx.user_repo();
    let roles = ctx.role_repo();
    let sessions = ctx.session_repo();
    let api_keys = ctx.api_key_repo();
    let user = UpdateUser {
        users: users.as_ref(),
        roles: roles.as_ref(),
        sessions: sessions.as_ref(),
        api_keys: api_keys.as_ref(),
    }
    .execute(id, &req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "update", "User")
            .with_subject_id(id)
            .with_metadata(json!({
                "is_active": req.is_active,
                "role_ids": req.role_ids,
            }))
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(user.into()))
}

#[utoipa::path(delete, path = "/api/users/{id}", tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn delete_user(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(Action::Delete, Subject::User)?;
    let users = ctx.user_repo();
    let sessions = ctx.session_repo();
    let api_keys = ctx.api_key_repo();
    DeleteUser {
        users: users.as_ref(),
        sessions: sessions.as_ref(),
        api_keys: api_keys.as_ref(),
    }
    .execute(principal.user_id, id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "delete", "User")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
