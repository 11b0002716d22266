pub mod accept;
pub mod list_policies;
pub mod manage_policy;

use uuid::Uuid;

use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::domain::terms::term_policy::{TermPolicy, current_per_kind, pending};

/// Latest published policy of every kind the user has not accepted.
pub async fn pending_for_user<R>(repo: &R, user_id: Uuid) -> anyhow::Result<Vec<TermPolicy>>
where
    R: TermPolicyRepository + ?Sized,
{
    let current = current_per_kind(&repo.list(false).await?);
    if current.is_empty() {
        return Ok(current);
    }
    let accepted = repo.accepted_policy_ids(user_id).await?;
    Ok(pending(current, &accepted))
}
