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
use crate::application::use_cases::api_keys::create_key::{CreateApiKey, CreateApiKeyRequest};
use crate::application::use_cases::api_keys::list_keys::ListApiKeys;
use crate::application::use_cases::api_keys::revoke_key::RevokeApiKey;
use crate::bootstrap::app_context::AppContext;
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::auth::api_key::ApiKey;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    /// First characters of the key, for recognising it in lists
    pub prefix: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(k: ApiKey) -> Self {
        Self {
            id: k.id,
            name: k.name,
            prefix: k.prefix,
            is_active: k.is_active,
            expires_at: k.expires_at,
            last_used_at: k.last_used_at,
            created_at: k.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedApiKeyResponse {
    #[serde(flatten)]
    pub key: ApiKeyResponse,
    /// Shown once; only its hash is stored
    pub api_key: String,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/api-keys", get(list_api_keys).post(create_api_key))
        .route("/api-keys/:id", delete(revoke_api_key))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/api-keys", tag = "ApiKeys", responses((status = 200, body = [ApiKeyResponse])))]
pub async fn list_api_keys(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<ApiKeyResponse>>> {
    let repo = ctx.api_key_repo();
    let keys = ListApiKeys {
        repo: repo.as_ref(),
    }
    .execute(principal.user_id)
    .await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/api-keys", tag = "ApiKeys", request_body = CreateApiKeyRequest,
    responses((status = 201, body = CreatedApiKeyResponse), (status = 400, body = ErrorBody)))]
pub async fn create_api_key(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreatedApiKeyResponse>)> {
    let repo = ctx.api_key_repo();
    let issued = CreateApiKey {
        repo: repo.as_ref(),
    }
    .execute(principal.user_id, &req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "create", "ApiKey")
            .with_subject_id(issued.key.id)
            .with_metadata(json!({ "name": issued.key.name, "prefix": issued.key.prefix }))
            .with_ip(client.ip),
    )
    .await;
    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse {
            key: issued.key.into(),
            api_key: issued.plaintext,
        }),
    ))
}

#[utoipa::path(delete, path = "/api/api-keys/{id}", tag = "ApiKeys",
    params(("id" = Uuid, Path, description = "API key ID")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn revoke_api_key(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let repo = ctx.api_key_repo();
    RevokeApiKey {
        repo: repo.as_ref(),
    }
    .execute(principal.user_id, id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "revoke", "ApiKey")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
