use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::domain::terms::term_policy::TermPolicy;

pub struct AcceptPolicy<'a, R: TermPolicyRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: TermPolicyRepository + ?Sized> AcceptPolicy<'a, R> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        policy_id: Uuid,
        ip: Option<&str>,
    ) -> AppResult<TermPolicy> {
        let policy = self
            .repo
            .find_by_id(policy_id)
            .await?
            .filter(TermPolicy::is_published)
            .ok_or_else(|| AppError::code(ErrorCode::TermPolicyNotFound))?;
        if !self.repo.record_acceptance(policy.id, user_id, ip).await? {
            return Err(AppError::code(ErrorCode::TermPolicyAlreadyAccepted));
        }
        tracing::info!(%user_id, policy_id = %policy.id, kind = %policy.kind, version = %policy.version, "term_policy_accepted");
        Ok(policy)
    }
}
