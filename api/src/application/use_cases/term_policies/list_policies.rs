use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::application::use_cases::term_policies::pending_for_user;
use crate::domain::terms::term_policy::{TermPolicy, current_per_kind};

pub struct ListPolicies<'a, R: TermPolicyRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: TermPolicyRepository + ?Sized> ListPolicies<'a, R> {
    /// Every policy including drafts, for administrators.
    pub async fn all(&self) -> AppResult<Vec<TermPolicy>> {
        Ok(self.repo.list(true).await?)
    }

    pub async fn current(&self) -> AppResult<Vec<TermPolicy>> {
        Ok(current_per_kind(&self.repo.list(false).await?))
    }

    pub async fn pending(&self, user_id: Uuid) -> AppResult<Vec<TermPolicy>> {
        Ok(pending_for_user(self.repo, user_id).await?)
    }

    /// Drafts are only visible with `include_drafts`.
    pub async fn get(&self, id: Uuid, include_drafts: bool) -> AppResult<TermPolicy> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|p| include_drafts || p.is_published())
            .ok_or_else(|| AppError::code(ErrorCode::TermPolicyNotFound))
    }
}
