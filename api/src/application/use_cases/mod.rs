pub mod activity_logs;
pub mod api_keys;
pub mod auth;
pub mod files;
pub mod notifications;
pub mod permissions;
pub mod roles;
pub mod settings;
pub mod term_policies;
pub mod users;
