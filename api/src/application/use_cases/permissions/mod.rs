pub mod create_permission;
pub mod delete_permission;
pub mod list_permissions;
