pub mod access;
pub mod activity;
pub mod auth;
pub mod files;
pub mod notifications;
pub mod settings;
pub mod terms;
pub mod users;
