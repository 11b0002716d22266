pub mod activity_log_repository;
pub mod api_key_repository;
pub mod files_repository;
pub mod notification_repository;
pub mod notification_sender;
pub mod permission_repository;
pub mod role_repository;
pub mod session_repository;
pub mod setting_repository;
pub mod storage_port;
pub mod term_policy_repository;
pub mod user_repository;
