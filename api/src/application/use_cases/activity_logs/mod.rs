pub mod list_activity;
