use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::application::errors::AppResult;
use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::activity_log_repository::{ActivityFilter, ActivityLogRepository};
use crate::domain::activity::activity_log::ActivityLog;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    pub actor_id: Option<Uuid>,
    pub subject: Option<String>,
    pub action: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ActivityQuery {
    pub fn filter(&self) -> ActivityFilter {
        let clean = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        ActivityFilter {
            actor_id: self.actor_id,
            subject: clean(&self.subject),
            action: clean(&self.action),
        }
    }

    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

pub struct ListActivity<'a, R: ActivityLogRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: ActivityLogRepository + ?Sized> ListActivity<'a, R> {
    pub async fn execute(&self, query: &ActivityQuery) -> AppResult<Page<ActivityLog>> {
        Ok(self.repo.list(&query.filter(), query.page()).await?)
    }

    /// Entries the user performed, regardless of any `actor_id` in the query.
    pub async fn for_actor(&self, actor_id: Uuid, query: &ActivityQuery) -> AppResult<Page<ActivityLog>> {
        let mut filter = query.filter();
        filter.actor_id = Some(actor_id);
        Ok(self.repo.list(&filter, query.page()).await?)
    }
}
