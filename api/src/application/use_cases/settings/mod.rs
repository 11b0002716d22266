pub mod delete_setting;
pub mod get_setting;
pub mod list_settings;
pub mod upsert_setting;
