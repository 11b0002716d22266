use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::services::audit;
use crate::application::use_cases::notifications::delivery_callback::{
    DeliveryCallback, HandleDeliveryCallback,
};
use crate::application::use_cases::notifications::inbox::Inbox;
use crate::application::use_cases::notifications::send_notification::{
    SendNotification, SendNotificationRequest,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::notifications::notification::{Channel, DeliveryStatus, Notification};
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};
use crate::presentation::http::pagination::PageResponse;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub status: DeliveryStatus,
    pub attempts: i32,
    pub read_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            channel: n.channel,
            title: n.title,
            body: n.body,
            data: n.data,
            status: n.status,
            attempts: n.attempts,
            read_at: n.read_at,
            sent_at: n.sent_at,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationsQuery {
    /// Only notifications that have not been read
    pub unread: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/notifications", get(list_notifications).post(send_notification))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/stream", get(stream_notifications))
        .route("/notifications/:id/read", post(mark_read))
        .route("/notifications/webhooks/:provider", post(delivery_webhook))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/notifications", tag = "Notifications", params(NotificationsQuery),
    responses((status = 200, body = NotificationPage)))]
pub async fn list_notifications(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Query(q): Query<NotificationsQuery>,
) -> ApiResult<Json<PageResponse<NotificationResponse>>> {
    let repo = ctx.notification_repo();
    let page = Inbox {
        notifications: repo.as_ref(),
    }
    .list(
        principal.user_id,
        q.unread.unwrap_or(false),
        PageRequest::new(q.page, q.limit),
    )
    .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(post, path = "/api/notifications/{id}/read", tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn mark_read(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let repo = ctx.notification_repo();
    Inbox {
        notifications: repo.as_ref(),
    }
    .mark_read(principal.user_id, id)
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/notifications/read-all", tag = "Notifications",
    responses((status = 200, body = MarkAllReadResponse)))]
pub async fn mark_all_read(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let repo = ctx.notification_repo();
    let updated = Inbox {
        notifications: repo.as_ref(),
    }
    .mark_all_read(principal.user_id)
    .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Server-sent events carrying the caller's new in-app notifications.
#[utoipa::path(get, path = "/api/notifications/stream", tag = "Notifications",
    responses((status = 200, description = "Notification event stream", content_type = "text/event-stream")))]
pub async fn stream_notifications(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let user_id = principal.user_id;
    tracing::debug!(%user_id, "notification_stream_opened");
    let initial = stream::iter(vec![Ok(Event::default().event("ready").data("{}"))]);
    let live = ctx.subscribe_notifications().filter_map(move |n| async move {
        if n.user_id != user_id || n.channel != Channel::InApp {
            return None;
        }
        let payload = serde_json::to_string(&NotificationResponse::from(n)).ok()?;
        Some(Ok(Event::default().event("notification").data(payload)))
    });
    let keepalive = KeepAlive::new()
        .interval(Duration::from_secs(25))
        .text(":\n");
    Sse::new(initial.chain(live)).keep_alive(keepalive)
}

#[utoipa::path(post, path = "/api/notifications", tag = "Notifications", request_body = SendNotificationRequest,
    responses((status = 201, body = NotificationResponse), (status = 404, body = ErrorBody)))]
pub async fn send_notification(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<SendNotificationRequest>,
) -> ApiResult<(StatusCode, Json<NotificationResponse>)> {
    principal.require(Action::Create, Subject::Notification)?;
    let users = ctx.user_repo();
    let notifications = ctx.notification_repo();
    let signal = ctx.notification_signal();
    let notification = SendNotification {
        users: users.as_ref(),
        notifications: notifications.as_ref(),
        signal: signal.as_ref(),
    }
    .execute(&req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "send", "Notification")
            .with_subject_id(notification.id)
            .with_metadata(json!({ "user_id": req.user_id, "channel": req.channel }))
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(notification.into())))
}

#[utoipa::path(post, path = "/api/notifications/webhooks/{provider}", tag = "Notifications",
    request_body = DeliveryCallback,
    params(
        ("provider" = String, Path, description = "Provider name, for logging"),
        ("x-webhook-secret" = String, Header, description = "Shared webhook secret")
    ),
    responses(
        (status = 204),
        (status = 401, body = ErrorBody),
        (status = 404, body = ErrorBody)
    ))]
pub async fn delivery_webhook(
    State(ctx): State<AppContext>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(callback): Json<DeliveryCallback>,
) -> ApiResult<StatusCode> {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    let repo = ctx.notification_repo();
    HandleDeliveryCallback {
        notifications: repo.as_ref(),
        secret: ctx.cfg.notify_webhook_secret.as_deref(),
    }
    .execute(&provider, presented, &callback)
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
