use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::use_cases::activity_logs::list_activity::{ActivityQuery, ListActivity};
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::activity::activity_log::ActivityLog;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::Authenticated;
use crate::presentation::http::pagination::PageResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityLogResponse {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub subject: String,
    pub subject_id: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(a: ActivityLog) -> Self {
        Self {
            id: a.id,
            actor_id: a.actor_id,
            action: a.action,
            subject: a.subject,
            subject_id: a.subject_id,
            metadata: a.metadata,
            ip: a.ip,
            created_at: a.created_at,
        }
    }
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/activity-logs", get(list_activity))
        .route("/activity-logs/me", get(my_activity))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/activity-logs", tag = "ActivityLogs", params(ActivityQuery),
    responses((status = 200, body = ActivityLogPage), (status = 403, body = ErrorBody)))]
pub async fn list_activity(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Query(q): Query<ActivityQuery>,
) -> ApiResult<Json<PageResponse<ActivityLogResponse>>> {
    principal.require(Action::Read, Subject::ActivityLog)?;
    let repo = ctx.activity_repo();
    let page = ListActivity {
        repo: repo.as_ref(),
    }
    .execute(&q)
    .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(get, path = "/api/activity-logs/me", tag = "ActivityLogs", params(ActivityQuery),
    responses((status = 200, body = ActivityLogPage)))]
pub async fn my_activity(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Query(q): Query<ActivityQuery>,
) -> ApiResult<Json<PageResponse<ActivityLogResponse>>> {
    let repo = ctx.activity_repo();
    let page = ListActivity {
        repo: repo.as_ref(),
    }
    .for_actor(principal.user_id, &q)
    .await?;
    Ok(Json(page.into()))
}
