use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::permission_repository::PermissionRepository;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::access::role::Permission;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePermissionRequest {
    pub action: String,
    pub subject: String,
    #[serde(default)]
    pub inverted: bool,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

pub struct CreatePermission<'a, P: PermissionRepository + ?Sized> {
    pub permissions: &'a P,
}

impl<'a, P: PermissionRepository + ?Sized> CreatePermission<'a, P> {
    pub async fn execute(&self, req: &CreatePermissionRequest) -> AppResult<Permission> {
        req.validate()?;
        let action: Action = req
            .action
            .parse()
            .map_err(|e| AppError::validation(format!("action: {e}")))?;
        let subject: Subject = req
            .subject
            .parse()
            .map_err(|e| AppError::validation(format!("subject: {e}")))?;
        if self
            .permissions
            .find(action, subject, req.inverted)
            .await?
            .is_some()
        {
            return Err(AppError::code(ErrorCode::PermissionExists));
        }
        Ok(self
            .permissions
            .create(action, subject, req.inverted, req.description.as_deref())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryDb;

    fn req(action: &str, subject: &str, inverted: bool) -> CreatePermissionRequest {
        CreatePermissionRequest {
            action: action.into(),
            subject: subject.into(),
            inverted,
            description: None,
        }
    }

    #[tokio::test]
    async fn parses_and_deduplicates_triples() {
        let db = MemoryDb::default();
        let uc = CreatePermission { permissions: &db };
        let p = uc.execute(&req("read", "api_key", false)).await.unwrap();
        assert_eq!((p.action, p.subject, p.inverted), (Action::Read, Subject::ApiKey, false));

        let err = uc.execute(&req("READ", "ApiKey", false)).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::PermissionExists);
        // the inverted twin is a different permission
        uc.execute(&req("read", "ApiKey", true)).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_names_fail_validation() {
        let db = MemoryDb::default();
        let uc = CreatePermission { permissions: &db };
        let err = uc.execute(&req("publish", "File", false)).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ValidationFailed);
        assert!(err.to_string().starts_with("action:"));
        let err = uc.execute(&req("read", "Document", false)).await.unwrap_err();
        assert!(err.to_string().starts_with("subject:"));
    }
}
