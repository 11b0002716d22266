use serde::Serialize;
use utoipa::ToSchema;

use crate::application::pagination::Page;
use crate::presentation::http::activity_logs::ActivityLogResponse;
use crate::presentation::http::files::FileResponse;
use crate::presentation::http::notifications::NotificationResponse;
use crate::presentation::http::users::UserResponse;

/// Envelope for every paginated list.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    UserPage = PageResponse<UserResponse>,
    FilePage = PageResponse<FileResponse>,
    NotificationPage = PageResponse<NotificationResponse>,
    ActivityLogPage = PageResponse<ActivityLogResponse>
)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T, U: Into<T>> From<Page<U>> for PageResponse<T> {
    fn from(p: Page<U>) -> Self {
        Self {
            items: p.items.into_iter().map(Into::into).collect(),
            total: p.total,
            page: p.page,
            limit: p.limit,
            total_pages: p.total_pages,
        }
    }
}
