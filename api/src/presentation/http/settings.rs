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

use crate::application::services::audit;
use crate::application::use_cases::settings::delete_setting::DeleteSetting;
use crate::application::use_cases::settings::get_setting::GetSetting;
use crate::application::use_cases::settings::list_settings::ListSettings;
use crate::application::use_cases::settings::upsert_setting::{UpsertSetting, UpsertSettingRequest};
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::settings::setting::Setting;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingResponse {
    pub key: String,
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub is_public: bool,
    pub is_secret: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Setting> for SettingResponse {
    fn from(s: Setting) -> Self {
        Self {
            key: s.key,
            value: s.value,
            description: s.description,
            is_public: s.is_public,
            is_secret: s.is_secret,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/settings", get(list_settings))
        .route("/settings/public", get(public_settings))
        .route(
            "/settings/:key",
            get(get_setting).put(upsert_setting).delete(delete_setting),
        )
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/settings/public", tag = "Settings",
    responses((status = 200, body = [SettingResponse])))]
pub async fn public_settings(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<SettingResponse>>> {
    let repo = ctx.setting_repo();
    let list = ListSettings {
        repo: repo.as_ref(),
    }
    .execute(true)
    .await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/api/settings", tag = "Settings", responses((status = 200, body = [SettingResponse])))]
pub async fn list_settings(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<SettingResponse>>> {
    principal.require(Action::Read, Subject::Setting)?;
    let repo = ctx.setting_repo();
    let list = ListSettings {
        repo: repo.as_ref(),
    }
    .execute(false)
    .await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

/// Secret values are returned decrypted here, unlike in listings.
#[utoipa::path(get, path = "/api/settings/{key}", tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    responses((status = 200, body = SettingResponse), (status = 404, body = ErrorBody)))]
pub async fn get_setting(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(key): Path<String>,
) -> ApiResult<Json<SettingResponse>> {
    principal.require(Action::Read, Subject::Setting)?;
    let repo = ctx.setting_repo();
    let setting = GetSetting {
        repo: repo.as_ref(),
    }
    .execute(&key)
    .await?;
    Ok(Json(setting.into()))
}

#[utoipa::path(put, path = "/api/settings/{key}", tag = "Settings", request_body = UpsertSettingRequest,
    params(("key" = String, Path, description = "Setting key")),
    responses((status = 200, body = SettingResponse), (status = 400, body = ErrorBody)))]
pub async fn upsert_setting(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(key): Path<String>,
    Json(req): Json<UpsertSettingRequest>,
) -> ApiResult<Json<SettingResponse>> {
    principal.require(Action::Update, Subject::Setting)?;
    let repo = ctx.setting_repo();
    let setting = UpsertSetting {
        repo: repo.as_ref(),
    }
    .execute(&key, &req)
    .await?;
    // secret values stay out of the activity log
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "upsert", "Setting")
            .with_subject_id(&setting.key)
            .with_metadata(json!({ "is_public": setting.is_public, "is_secret": setting.is_secret }))
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(setting.masked().into()))
}

#[utoipa::path(delete, path = "/api/settings/{key}", tag = "Settings",
    params(("key" = String, Path, description = "Setting key")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn delete_setting(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    principal.require(Action::Delete, Subject::Setting)?;
    let repo = ctx.setting_repo();
    DeleteSetting {
        repo: repo.as_ref(),
    }
    .execute(&key)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "delete", "Setting")
            .with_subject_id(&key)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
