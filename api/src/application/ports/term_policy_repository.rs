use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::terms::term_policy::TermPolicy;

#[async_trait]
pub trait TermPolicyRepository: Send + Sync {
    async fn list(&self, include_drafts: bool) -> anyhow::Result<Vec<TermPolicy>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<TermPolicy>>;
    /// Returns None when a live policy already holds (kind, version).
    async fn create(
        &self,
        kind: &str,
        version: &str,
        title: &str,
        content: &str,
    ) -> anyhow::Result<Option<TermPolicy>>;
    /// Only drafts are editable; returns None for published or missing policies.
    async fn update_draft(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> anyhow::Result<Option<TermPolicy>>;
    async fn publish(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<Option<TermPolicy>>;
    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn accepted_policy_ids(&self, user_id: Uuid) -> anyhow::Result<HashSet<Uuid>>;
    /// Returns false when the acceptance already existed.
    async fn record_acceptance(
        &self,
        policy_id: Uuid,
        user_id: Uuid,
        ip: Option<&str>,
    ) -> anyhow::Result<bool>;
}
