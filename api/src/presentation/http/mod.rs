use axum::Router;

use crate::bootstrap::app_context::AppContext;

pub mod activity_logs;
pub mod api_keys;
pub mod auth;
pub mod error;
pub mod files;
pub mod guard;
pub mod health;
pub mod notifications;
pub mod pagination;
pub mod permissions;
pub mod roles;
pub mod settings;
pub mod term_policies;
pub mod users;

/// Every authenticated or public API route, ready to be nested under `/api`.
/// Health is mounted separately since it only needs the pool.
pub fn api_routes(ctx: AppContext) -> Router {
    Router::new()
        .merge(auth::routes(ctx.clone()))
        .merge(users::routes(ctx.clone()))
        .merge(roles::routes(ctx.clone()))
        .merge(permissions::routes(ctx.clone()))
        .merge(api_keys::routes(ctx.clone()))
        .merge(term_policies::routes(ctx.clone()))
        .merge(notifications::routes(ctx.clone()))
        .merge(files::routes(ctx.clone()))
        .merge(settings::routes(ctx.clone()))
        .merge(activity_logs::routes(ctx))
}
