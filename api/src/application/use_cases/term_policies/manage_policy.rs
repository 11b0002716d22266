use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::domain::terms::term_policy::TermPolicy;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePolicyRequest {
    #[validate(length(min = 1, max = 50))]
    pub kind: String,
    #[validate(length(min = 1, max = 50))]
    pub version: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePolicyRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
}

/// Draft lifecycle: create, edit, publish once, delete while still a draft.
pub struct ManagePolicy<'a, R: TermPolicyRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: TermPolicyRepository + ?Sized> ManagePolicy<'a, R> {
    pub async fn create(&self, req: &CreatePolicyRequest) -> AppResult<TermPolicy> {
        req.validate()?;
        let kind = req.kind.trim().to_lowercase();
        let version = req.version.trim();
        self.repo
            .create(&kind, version, req.title.trim(), &req.content)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::Conflict,
                    format!("{kind} version {version} already exists"),
                )
            })
    }

    pub async fn update(&self, id: Uuid, req: &UpdatePolicyRequest) -> AppResult<TermPolicy> {
        req.validate()?;
        self.draft(id).await?;
        self.repo
            .update_draft(id, req.title.as_deref().map(str::trim), req.content.as_deref())
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::TermPolicyAlreadyPublished))
    }

    pub async fn publish(&self, id: Uuid) -> AppResult<TermPolicy> {
        self.draft(id).await?;
        let policy = self
            .repo
            .publish(id, Utc::now())
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::TermPolicyAlreadyPublished))?;
        tracing::info!(policy_id = %policy.id, kind = %policy.kind, version = %policy.version, "term_policy_published");
        Ok(policy)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.draft(id).await?;
        if !self.repo.soft_delete(id).await? {
            return Err(AppError::code(ErrorCode::TermPolicyNotFound));
        }
        Ok(())
    }

    async fn draft(&self, id: Uuid) -> AppResult<TermPolicy> {
        let policy = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::TermPolicyNotFound))?;
        if policy.is_published() {
            return Err(AppError::code(ErrorCode::TermPolicyAlreadyPublished));
        }
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryDb;

    fn create_req(kind: &str, version: &str) -> CreatePolicyRequest {
        CreatePolicyRequest {
            kind: kind.into(),
            version: version.into(),
            title: "Terms of Service".into(),
            content: "Be nice.".into(),
        }
    }

    #[tokio::test]
    async fn draft_lifecycle() {
        let db = MemoryDb::default();
        let uc = ManagePolicy { repo: &db };
        let draft = uc.create(&create_req("Terms", "1.0")).await.unwrap();
        assert_eq!(draft.kind, "terms");

        let edited = uc
            .update(
                draft.id,
                &UpdatePolicyRequest {
                    content: Some("Be very nice.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.content, "Be very nice.");
        assert_eq!(edited.title, "Terms of Service");

        let published = uc.publish(draft.id).await.unwrap();
        assert!(published.is_published());

        for err in [
            uc.publish(draft.id).await.unwrap_err(),
            uc.update(draft.id, &UpdatePolicyRequest::default())
                .await
                .unwrap_err(),
            uc.delete(draft.id).await.unwrap_err(),
        ] {
            assert_eq!(err.error_code(), ErrorCode::TermPolicyAlreadyPublished);
        }
    }

    #[tokio::test]
    async fn duplicate_version_conflicts() {
        let db = MemoryDb::default();
        let uc = ManagePolicy { repo: &db };
        uc.create(&create_req("terms", "1")).await.unwrap();
        let err = uc.create(&create_req("terms", "1")).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Conflict);
        uc.create(&create_req("privacy", "1")).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_creates_admit_one() {
        let db = MemoryDb::default();
        let uc = ManagePolicy { repo: &db };
        let req = create_req("terms", "2");
        let (a, b) = tokio::join!(uc.create(&req), uc.create(&req));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let err = a.err().or(b.err()).unwrap();
        assert_eq!(err.error_code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn deleted_draft_frees_its_version() {
        let db = MemoryDb::default();
        let uc = ManagePolicy { repo: &db };
        let draft = uc.create(&create_req("terms", "3")).await.unwrap();
        uc.delete(draft.id).await.unwrap();
        uc.create(&create_req("terms", "3")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_draft_then_not_found() {
        let db = MemoryDb::default();
        let uc = ManagePolicy { repo: &db };
        let draft = uc.create(&create_req("terms", "1")).await.unwrap();
        uc.delete(draft.id).await.unwrap();
        let err = uc.publish(draft.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::TermPolicyNotFound);
    }
}
