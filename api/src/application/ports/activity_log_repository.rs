use async_trait::async_trait;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::activity::activity_log::{ActivityLog, NewActivity};

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub actor_id: Option<Uuid>,
    pub subject: Option<String>,
    pub action: Option<String>,
}

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn record(&self, entry: NewActivity) -> anyhow::Result<()>;
    async fn list(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<ActivityLog>>;
}
