use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tenant_api::application::ports::notification_sender::NotificationSender;
use tenant_api::application::ports::storage_port::StoragePort;
use tenant_api::application::services::notifications::{DispatcherSettings, NotificationDispatcher};
use tenant_api::application::use_cases::auth::sessions::PurgeExpiredSessions;
use tenant_api::bootstrap::app_context::{AppContext, AppServices};
use tenant_api::bootstrap::config::{Config, StorageBackend};
use tenant_api::bootstrap::seed::seed;
use tenant_api::domain::notifications::notification::Channel;
use tenant_api::infrastructure::db::repositories::{
    activity_log_repository_sqlx::SqlxActivityLogRepository,
    api_key_repository_sqlx::SqlxApiKeyRepository, files_repository_sqlx::SqlxFilesRepository,
    notification_repository_sqlx::SqlxNotificationRepository,
    permission_repository_sqlx::SqlxPermissionRepository,
    role_repository_sqlx::SqlxRoleRepository, session_repository_sqlx::SqlxSessionRepository,
    setting_repository_sqlx::SqlxSettingRepository,
    term_policy_repository_sqlx::SqlxTermPolicyRepository,
    user_repository_sqlx::SqlxUserRepository,
};
use tenant_api::infrastructure::notifications::{
    log_sender::LogNotificationSender, signal::BroadcastNotificationSignal,
    webhook_sender::WebhookNotificationSender,
};
use tenant_api::infrastructure::storage::{fs::FsStoragePort, s3::S3StoragePort};
use tenant_api::presentation::http as api_http;

#[derive(OpenApi)]
#[openapi(
        paths(
            api_http::auth::register,
            api_http::auth::login,
            api_http::auth::refresh,
            api_http::auth::logout,
            api_http::auth::me,
            api_http::auth::update_me,
            api_http::auth::change_password,
            api_http::auth::abilities,
            api_http::auth::list_sessions,
            api_http::auth::revoke_session,
            api_http::users::list_users,
            api_http::users::create_user,
            api_http::users::get_user,
            api_http::users::update_user,
            api_http::users::delete_user,
            api_http::roles::list_roles,
            api_http::roles::create_role,
            api_http::roles::get_role,
            api_http::roles::update_role,
            api_http::roles::delete_role,
            api_http::permissions::list_permissions,
            api_http::permissions::create_permission,
            api_http::permissions::delete_permission,
            api_http::api_keys::list_api_keys,
            api_http::api_keys::create_api_key,
            api_http::api_keys::revoke_api_key,
            api_http::settings::public_settings,
            api_http::settings::list_settings,
            api_http::settings::get_setting,
            api_http::settings::upsert_setting,
            api_http::settings::delete_setting,
            api_http::term_policies::list_policies,
            api_http::term_policies::current_policies,
            api_http::term_policies::pending_policies,
            api_http::term_policies::get_policy,
            api_http::term_policies::create_policy,
            api_http::term_policies::update_policy,
            api_http::term_policies::publish_policy,
            api_http::term_policies::delete_policy,
            api_http::term_policies::accept_policy,
            api_http::notifications::list_notifications,
            api_http::notifications::mark_read,
            api_http::notifications::mark_all_read,
            api_http::notifications::stream_notifications,
            api_http::notifications::send_notification,
            api_http::notifications::delivery_webhook,
            api_http::files::upload_file,
            api_http::files::list_files,
            api_http::files::get_file,
            api_http::files::file_content,
            api_http::files::delete_file,
            api_http::files::presign_upload,
            api_http::files::presign_download,
            api_http::activity_logs::list_activity,
            api_http::activity_logs::my_activity,
            api_http::health::health,
        ),
        components(schemas(
            api_http::error::ErrorBody,
            api_http::pagination::UserPage,
            api_http::pagination::FilePage,
            api_http::pagination::NotificationPage,
            api_http::pagination::ActivityLogPage,
            api_http::auth::LoginResponse,
            api_http::auth::TokenResponse,
            api_http::auth::SessionResponse,
            api_http::auth::PasswordChangedResponse,
            api_http::users::UserResponse,
            api_http::roles::RoleResponse,
            api_http::permissions::PermissionResponse,
            api_http::api_keys::ApiKeyResponse,
            api_http::api_keys::CreatedApiKeyResponse,
            api_http::settings::SettingResponse,
            api_http::term_policies::TermPolicyResponse,
            api_http::notifications::NotificationResponse,
            api_http::notifications::MarkAllReadResponse,
            api_http::files::FileResponse,
            api_http::files::UploadFileMultipart,
            api_http::files::PresignedUploadResponse,
            api_http::files::PresignedDownloadResponse,
            api_http::activity_logs::ActivityLogResponse,
            api_http::health::HealthResponse,
            tenant_api::application::use_cases::auth::register::RegisterRequest,
            tenant_api::application::use_cases::auth::login::LoginRequest,
            tenant_api::application::use_cases::auth::refresh::RefreshRequest,
            tenant_api::application::use_cases::auth::me::UpdateMeRequest,
            tenant_api::application::use_cases::auth::change_password::ChangePasswordRequest,
            tenant_api::application::use_cases::users::create_user::CreateUserRequest,
            tenant_api::application::use_cases::users::update_user::UpdateUserRequest,
            tenant_api::application::use_cases::roles::create_role::CreateRoleRequest,
            tenant_api::application::use_cases::roles::update_role::UpdateRoleRequest,
            tenant_api::application::use_cases::permissions::create_permission::CreatePermissionRequest,
            tenant_api::application::use_cases::api_keys::create_key::CreateApiKeyRequest,
            tenant_api::application::use_cases::settings::upsert_setting::UpsertSettingRequest,
            tenant_api::application::use_cases::term_policies::manage_policy::CreatePolicyRequest,
            tenant_api::application::use_cases::term_policies::manage_policy::UpdatePolicyRequest,
            tenant_api::application::use_cases::notifications::send_notification::SendNotificationRequest,
            tenant_api::application::use_cases::notifications::delivery_callback::DeliveryCallback,
            tenant_api::application::use_cases::notifications::delivery_callback::ProviderStatus,
            tenant_api::application::use_cases::files::presign::PresignUploadRequest,
            tenant_api::domain::access::ability::Action,
            tenant_api::domain::access::ability::Subject,
            tenant_api::domain::access::ability::Rule,
            tenant_api::domain::notifications::notification::Channel,
            tenant_api::domain::notifications::notification::DeliveryStatus,
        )),
        tags(
            (name = "Auth", description = "Login, tokens and the current account"),
            (name = "Users", description = "User administration"),
            (name = "Roles", description = "Roles and their permissions"),
            (name = "Permissions", description = "Permission catalogue"),
            (name = "ApiKeys", description = "Personal API keys"),
            (name = "Settings", description = "Runtime settings"),
            (name = "TermPolicies", description = "Terms of service and acceptance"),
            (name = "Notifications", description = "Notification outbox and live feed"),
            (name = "Files", description = "File management"),
            (name = "ActivityLogs", description = "Audit trail"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

fn cors_layer(cfg: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::PATCH,
            http::Method::OPTIONS,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            http::header::HeaderName::from_static(api_http::guard::API_KEY_HEADER),
        ]);
    match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin).allow_credentials(true),
        // production requires FRONTEND_URL, so an unparsable one denies everything
        _ if cfg.is_production => base.allow_origin(AllowOrigin::exact(HeaderValue::from_static(
            "http://invalid",
        ))),
        _ => base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true),
    }
}

fn notification_senders(cfg: &Config) -> Vec<Arc<dyn NotificationSender>> {
    let mut senders: Vec<Arc<dyn NotificationSender>> = Vec::new();
    let mut logged = Vec::new();
    for (channel, url) in [
        (Channel::Email, &cfg.notify_email_webhook_url),
        (Channel::Sms, &cfg.notify_sms_webhook_url),
        (Channel::Push, &cfg.notify_push_webhook_url),
    ] {
        match url {
            Some(url) => {
                info!(%channel, "notification_webhook_sender_configured");
                senders.push(Arc::new(WebhookNotificationSender::new(channel, url.clone())));
            }
            None => logged.push(channel),
        }
    }
    if !logged.is_empty() {
        info!(channels = ?logged, "notification_log_sender_fallback");
        senders.push(Arc::new(LogNotificationSender::new(logged)));
    }
    senders
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "ctrl_c_handler_failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(?e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown_signal_received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tenant_api=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(?cfg, "Starting tenant API");

    // Database
    let pool = tenant_api::infrastructure::db::connect_pool(
        &cfg.database_url,
        cfg.database_max_connections,
    )
    .await?;
    tenant_api::infrastructure::db::migrate(&pool).await?;

    let user_repo = Arc::new(SqlxUserRepository::new(pool.clone()));
    let role_repo = Arc::new(SqlxRoleRepository::new(pool.clone()));
    let permission_repo = Arc::new(SqlxPermissionRepository::new(pool.clone()));
    let session_repo = Arc::new(SqlxSessionRepository::new(pool.clone()));
    let api_key_repo = Arc::new(SqlxApiKeyRepository::new(pool.clone()));
    let setting_repo = Arc::new(SqlxSettingRepository::new(
        pool.clone(),
        cfg.encryption_key.clone(),
    ));
    let term_policy_repo = Arc::new(SqlxTermPolicyRepository::new(pool.clone()));
    let activity_repo = Arc::new(SqlxActivityLogRepository::new(pool.clone()));
    let notification_repo = Arc::new(SqlxNotificationRepository::new(pool.clone()));
    let files_repo = Arc::new(SqlxFilesRepository::new(pool.clone()));

    let admin = cfg
        .admin_email
        .as_deref()
        .zip(cfg.admin_password.as_deref());
    seed(
        user_repo.as_ref(),
        role_repo.as_ref(),
        permission_repo.as_ref(),
        admin,
    )
    .await?;

    let storage_port: Arc<dyn StoragePort> = match cfg.storage_backend {
        StorageBackend::Filesystem => {
            if let Err(e) = tokio::fs::create_dir_all(&cfg.storage_root).await {
                tracing::warn!(error=?e, dir=%cfg.storage_root, "Failed to create uploads dir");
            }
            Arc::new(FsStoragePort::new(&cfg.storage_root))
        }
        StorageBackend::S3 => Arc::new(S3StoragePort::new(&cfg).await?),
    };

    // Notifications: the signal wakes the dispatcher and feeds the SSE stream
    let wake = Arc::new(Notify::new());
    let (events_tx, _) = broadcast::channel(256);
    let signal = Arc::new(BroadcastNotificationSignal::new(
        wake.clone(),
        events_tx.clone(),
    ));

    let services = AppServices::new(
        user_repo.clone(),
        role_repo,
        permission_repo,
        session_repo.clone(),
        api_key_repo,
        setting_repo,
        term_policy_repo,
        activity_repo,
        notification_repo.clone(),
        files_repo,
        storage_port,
        signal,
        events_tx,
    );
    let ctx = AppContext::new(cfg.clone(), services);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = NotificationDispatcher::new(
        notification_repo,
        user_repo,
        notification_senders(&cfg),
        wake,
        DispatcherSettings {
            batch_size: cfg.notify_batch_size.max(1),
            max_attempts: cfg.notify_max_attempts.max(1),
            poll_interval: Duration::from_secs(cfg.notify_poll_secs.max(1)),
            ..DispatcherSettings::default()
        },
    );
    let dispatcher_handle: JoinHandle<()> = tokio::spawn(dispatcher.run(shutdown_rx.clone()));

    // Hourly sweep of sessions past their retention window
    let purge_handle: JoinHandle<()> = {
        let sessions = session_repo;
        let retention = cfg.session_retention();
        let mut shutdown = shutdown_rx;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(60 * 60));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let purge = PurgeExpiredSessions { sessions: sessions.as_ref(), retention };
                        if let Err(e) = purge.execute().await {
                            error!(error = ?e, "session_purge_failed");
                        }
                    }
                    _ = shutdown.changed() => return,
                }
            }
        })
    };

    // multipart framing needs a little room above the file limit
    let body_limit = cfg.upload_max_bytes.saturating_add(64 * 1024);

    let app = Router::new()
        .nest("/api", api_http::health::routes(pool.clone()))
        .nest("/api", api_http::api_routes(ctx))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&cfg))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;
    if let Err(e) = &served {
        error!(?e, "API server failed");
    }

    let _ = shutdown_tx.send(true);
    for (name, handle) in [("dispatcher", dispatcher_handle), ("session_purge", purge_handle)] {
        if let Err(e) = handle.await {
            error!(?e, task = name, "background task panicked");
        }
    }
    info!("Shutdown complete");
    served.map_err(Into::into)
}
