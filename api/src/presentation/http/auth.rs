use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::use_cases::auth::change_password::{ChangePassword, ChangePasswordRequest};
use crate::application::use_cases::auth::login::{Login, LoginRequest};
use crate::application::use_cases::auth::logout::Logout;
use crate::application::use_cases::auth::me::{GetMe, UpdateMe, UpdateMeRequest};
use crate::application::use_cases::auth::refresh::{Refresh, RefreshRequest};
use crate::application::use_cases::auth::register::{Register, RegisterRequest};
use crate::application::use_cases::auth::sessions::{ListSessions, RevokeSession};
use crate::application::services::audit;
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::Rule;
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::auth::session::Session;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{
    Authenticated, Client, access_cookie, cleared_access_cookie, issue_access_token,
};
use crate::presentation::http::term_policies::TermPolicyResponse;
use crate::presentation::http::users::UserResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: UserResponse,
    /// Published policies the user still has to accept
    pub pending_policies: Vec<TermPolicyResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// True for the session that made this request
    pub current: bool,
}

impl SessionResponse {
    fn from_session(s: Session, current: Option<Uuid>) -> Self {
        Self {
            current: current == Some(s.id),
            id: s.id,
            user_agent: s.user_agent,
            ip: s.ip,
            created_at: s.created_at,
            last_used_at: s.last_used_at,
            expires_at: s.expires_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordChangedResponse {
    pub revoked_sessions: u64,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me).patch(update_me))
        .route("/auth/me/password", post(change_password))
        .route("/auth/me/abilities", get(abilities))
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/sessions/:id", delete(revoke_session))
        .with_state(ctx)
}

#[utoipa::path(post, path = "/api/auth/register", tag = "Auth", request_body = RegisterRequest, responses(
    (status = 201, body = UserResponse),
    (status = 409, description = "Email already registered", body = ErrorBody)
))]
pub async fn register(
    State(ctx): State<AppContext>,
    Client(client): Client,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let users = ctx.user_repo();
    let roles = ctx.role_repo();
    let notifications = ctx.notification_repo();
    let signal = ctx.notification_signal();
    let user = Register {
        users: users.as_ref(),
        roles: roles.as_ref(),
        notifications: notifications.as_ref(),
        signal: signal.as_ref(),
        default_role: &ctx.cfg.default_role,
    }
    .execute(&req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(user.id), "register", "User")
            .with_subject_id(user.id)
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "Auth", request_body = LoginRequest, responses(
    (status = 200, body = LoginResponse),
    (status = 401, description = "Invalid credentials", body = ErrorBody)
))]
pub async fn login(
    State(ctx): State<AppContext>,
    Client(client): Client,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<LoginResponse>)> {
    let users = ctx.user_repo();
    let sessions = ctx.session_repo();
    let policies = ctx.term_policy_repo();
    let out = Login {
        users: users.as_ref(),
        sessions: sessions.as_ref(),
        policies: policies.as_ref(),
        refresh_ttl: ctx.cfg.refresh_ttl(),
    }
    .execute(&req, &client)
    .await?;
    let access = issue_access_token(&ctx.cfg, out.user.id, out.session.id)?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(out.user.id), "login", "Session")
            .with_subject_id(out.session.id)
            .with_ip(client.ip),
    )
    .await;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, access_cookie(&ctx.cfg, &access.token));
    Ok((
        headers,
        Json(LoginResponse {
            access_token: access.token,
            token_type: "Bearer".into(),
            expires_in: access.expires_in,
            refresh_token: out.refresh_token,
            user: out.user.into(),
            pending_policies: out.pending_policies.into_iter().map(Into::into).collect(),
        }),
    ))
}

#[utoipa::path(post, path = "/api/auth/refresh", tag = "Auth", request_body = RefreshRequest, responses(
    (status = 200, body = TokenResponse),
    (status = 401, description = "Session invalid or expired", body = ErrorBody)
))]
pub async fn refresh(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<(HeaderMap, Json<TokenResponse>)> {
    let users = ctx.user_repo();
    let sessions = ctx.session_repo();
    let out = Refresh {
        users: users.as_ref(),
        sessions: sessions.as_ref(),
        refresh_ttl: ctx.cfg.refresh_ttl(),
    }
    .execute(&req.refresh_token)
    .await?;
    let access = issue_access_token(&ctx.cfg, out.user_id, out.session_id)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, access_cookie(&ctx.cfg, &access.token));
    Ok((
        headers,
        Json(TokenResponse {
            access_token: access.token,
            token_type: "Bearer".into(),
            expires_in: access.expires_in,
            refresh_token: out.refresh_token,
        }),
    ))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "Auth", responses((status = 204)))]
pub async fn logout(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<(HeaderMap, StatusCode)> {
    let sessions = ctx.session_repo();
    Logout {
        sessions: sessions.as_ref(),
    }
    .execute(&principal)
    .await?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cleared_access_cookie(&ctx.cfg));
    Ok((headers, StatusCode::NO_CONTENT))
}

#[utoipa::path(get, path = "/api/auth/me", tag = "Auth", responses((status = 200, body = UserResponse)))]
pub async fn me(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<UserResponse>> {
    let users = ctx.user_repo();
    let user = GetMe {
        users: users.as_ref(),
    }
    .execute(principal.user_id)
    .await?;
    Ok(Json(user.into()))
}

#[utoipa::path(patch, path = "/api/auth/me", tag = "Auth", request_body = UpdateMeRequest, responses((status = 200, body = UserResponse)))]
pub async fn update_me(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    let users = ctx.user_repo();
    let user = UpdateMe {
        users: users.as_ref(),
    }
    .execute(principal.user_id, &req)
    .await?;
    Ok(Json(user.into()))
}

#[utoipa::path(post, path = "/api/auth/me/password", tag = "Auth", request_body = ChangePasswordRequest, responses(
    (status = 200, body = PasswordChangedResponse),
    (status = 401, description = "Current password is wrong", body = ErrorBody)
))]
pub async fn change_password(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<PasswordChangedResponse>> {
    let users = ctx.user_repo();
    let sessions = ctx.session_repo();
    let notifications = ctx.notification_repo();
    let signal = ctx.notification_signal();
    let revoked_sessions = ChangePassword {
        users: users.as_ref(),
        sessions: sessions.as_ref(),
        notifications: notifications.as_ref(),
        signal: signal.as_ref(),
    }
    .execute(&principal, &req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "change_password", "User")
            .with_subject_id(principal.user_id)
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(PasswordChangedResponse { revoked_sessions }))
}

/// Effective rules of the caller, for clients that mirror the checks in the UI.
#[utoipa::path(get, path = "/api/auth/me/abilities", tag = "Auth", responses((status = 200, body = [Rule])))]
pub async fn abilities(Authenticated(principal): Authenticated) -> Json<Vec<Rule>> {
    Json(principal.ability.rules().to_vec())
}

#[utoipa::path(get, path = "/api/auth/sessions", tag = "Auth", responses((status = 200, body = [SessionResponse])))]
pub async fn list_sessions(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<SessionResponse>>> {
    let sessions = ctx.session_repo();
    let list = ListSessions {
        sessions: sessions.as_ref(),
    }
    .execute(principal.user_id)
    .await?;
    let current = principal.session_id();
    Ok(Json(
        list.into_iter()
            .map(|s| SessionResponse::from_session(s, current))
            .collect(),
    ))
}

#[utoipa::path(delete, path = "/api/auth/sessions/{id}", tag = "Auth",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn revoke_session(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let sessions = ctx.session_repo();
    RevokeSession {
        sessions: sessions.as_ref(),
    }
    .execute(principal.user_id, id)
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
