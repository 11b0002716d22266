use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::application::ports::activity_log_repository::ActivityLogRepository;
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::NotificationSignal;
use crate::application::ports::permission_repository::PermissionRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::session_repository::SessionRepository;
use crate::application::ports::setting_repository::SettingRepository;
use crate::application::ports::storage_port::StoragePort;
use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::bootstrap::config::Config;
use crate::domain::notifications::notification::Notification;

/// Router state shared by every handler.
#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    permission_repo: Arc<dyn PermissionRepository>,
    session_repo: Arc<dyn SessionRepository>,
    api_key_repo: Arc<dyn ApiKeyRepository>,
    setting_repo: Arc<dyn SettingRepository>,
    term_policy_repo: Arc<dyn TermPolicyRepository>,
    activity_repo: Arc<dyn ActivityLogRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    files_repo: Arc<dyn FilesRepository>,
    storage_port: Arc<dyn StoragePort>,
    notification_signal: Arc<dyn NotificationSignal>,
    notification_events: broadcast::Sender<Notification>,
}

impl AppServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        session_repo: Arc<dyn SessionRepository>,
        api_key_repo: Arc<dyn ApiKeyRepository>,
        setting_repo: Arc<dyn SettingRepository>,
        term_policy_repo: Arc<dyn TermPolicyRepository>,
        activity_repo: Arc<dyn ActivityLogRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
        files_repo: Arc<dyn FilesRepository>,
        storage_port: Arc<dyn StoragePort>,
        notification_signal: Arc<dyn NotificationSignal>,
        notification_events: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            permission_repo,
            session_repo,
            api_key_repo,
            setting_repo,
            term_policy_repo,
            activity_repo,
            notification_repo,
            files_repo,
            storage_port,
            notification_signal,
            notification_events,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn user_repo(&self) -> Arc<dyn UserRepository> {
        self.services.user_repo.clone()
    }

    pub fn role_repo(&self) -> Arc<dyn RoleRepository> {
        self.services.role_repo.clone()
    }

    pub fn permission_repo(&self) -> Arc<dyn PermissionRepository> {
        self.services.permission_repo.clone()
    }

    pub fn session_repo(&self) -> Arc<dyn SessionRepository> {
        self.services.session_repo.clone()
    }

    pub fn api_key_repo(&self) -> Arc<dyn ApiKeyRepository> {
        self.services.api_key_repo.clone()
    }

    pub fn setting_repo(&self) -> Arc<dyn SettingRepository> {
        self.services.setting_repo.clone()
    }

    pub fn term_policy_repo(&self) -> Arc<dyn TermPolicyRepository> {
        self.services.term_policy_repo.clone()
    }

    pub fn activity_repo(&self) -> Arc<dyn ActivityLogRepository> {
        self.services.activity_repo.clone()
    }

    pub fn notification_repo(&self) -> Arc<dyn NotificationRepository> {
        self.services.notification_repo.clone()
    }

    pub fn files_repo(&self) -> Arc<dyn FilesRepository> {
        self.services.files_repo.clone()
    }

    pub fn storage_port(&self) -> Arc<dyn StoragePort> {
        self.services.storage_port.clone()
    }

    pub fn notification_signal(&self) -> Arc<dyn NotificationSignal> {
        self.services.notification_signal.clone()
    }

    /// Live feed of stored in-app notifications; lagged receivers skip ahead.
    pub fn subscribe_notifications(&self) -> BoxStream<'static, Notification> {
        BroadcastStream::new(self.services.notification_events.subscribe())
            .filter_map(|evt| async move { evt.ok() })
            .boxed()
    }
}
