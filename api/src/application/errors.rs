use std::borrow::Cow;

use http::StatusCode;

use crate::domain::auth::api_key::ApiKeyRejection;

/// Numeric application codes, grouped by domain in blocks of one hundred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // common
    ValidationFailed = 1000,
    NotFound = 1001,
    Conflict = 1002,
    Internal = 1500,
    // auth & sessions
    Unauthorized = 4100,
    InvalidCredentials = 4101,
    SessionInvalid = 4102,
    SessionExpired = 4103,
    EmailTaken = 4104,
    Forbidden = 4105,
    UserInactive = 4106,
    // users
    UserNotFound = 4200,
    // roles
    RoleNotFound = 4300,
    RoleNameTaken = 4301,
    RoleProtected = 4302,
    // permissions
    PermissionNotFound = 4400,
    PermissionExists = 4401,
    // settings
    SettingNotFound = 4500,
    // files
    FileNotFound = 4600,
    FileTooLarge = 4601,
    FileInvalid = 4602,
    FilePresignUnsupported = 4603,
    // notifications
    NotificationNotFound = 4700,
    WebhookUnauthorized = 4701,
    // api keys
    ApiKeyInvalid = 5100,
    ApiKeyInactive = 5101,
    ApiKeyExpired = 5102,
    ApiKeyNotFound = 5103,
    // term policies
    TermPolicyNotFound = 6100,
    TermPolicyAlreadyAccepted = 6101,
    TermPolicyAlreadyPublished = 6102,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Internal => "INTERNAL_ERROR",
            ErrorCode::Unauthorized => "AUTH_UNAUTHORIZED",
            ErrorCode::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            ErrorCode::SessionInvalid => "AUTH_SESSION_INVALID",
            ErrorCode::SessionExpired => "AUTH_SESSION_EXPIRED",
            ErrorCode::EmailTaken => "AUTH_EMAIL_TAKEN",
            ErrorCode::Forbidden => "AUTH_FORBIDDEN",
            ErrorCode::UserInactive => "AUTH_USER_INACTIVE",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::RoleNotFound => "ROLE_NOT_FOUND",
            ErrorCode::RoleNameTaken => "ROLE_NAME_TAKEN",
            ErrorCode::RoleProtected => "ROLE_PROTECTED",
            ErrorCode::PermissionNotFound => "PERMISSION_NOT_FOUND",
            ErrorCode::PermissionExists => "PERMISSION_EXISTS",
            ErrorCode::SettingNotFound => "SETTING_NOT_FOUND",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::FileInvalid => "FILE_INVALID",
            ErrorCode::FilePresignUnsupported => "FILE_PRESIGN_UNSUPPORTED",
            ErrorCode::NotificationNotFound => "NOTIFICATION_NOT_FOUND",
            ErrorCode::WebhookUnauthorized => "WEBHOOK_UNAUTHORIZED",
            ErrorCode::ApiKeyInvalid => "API_KEY_INVALID",
            ErrorCode::ApiKeyInactive => "API_KEY_INACTIVE",
            ErrorCode::ApiKeyExpired => "API_KEY_EXPIRED",
            ErrorCode::ApiKeyNotFound => "API_KEY_NOT_FOUND",
            ErrorCode::TermPolicyNotFound => "TERM_POLICY_NOT_FOUND",
            ErrorCode::TermPolicyAlreadyAccepted => "TERM_POLICY_ALREADY_ACCEPTED",
            ErrorCode::TermPolicyAlreadyPublished => "TERM_POLICY_ALREADY_PUBLISHED",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::FileInvalid => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound
            | ErrorCode::UserNotFound
            | ErrorCode::RoleNotFound
            | ErrorCode::PermissionNotFound
            | ErrorCode::SettingNotFound
            | ErrorCode::FileNotFound
            | ErrorCode::NotificationNotFound
            | ErrorCode::ApiKeyNotFound
            | ErrorCode::TermPolicyNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict
            | ErrorCode::EmailTaken
            | ErrorCode::RoleNameTaken
            | ErrorCode::PermissionExists
            | ErrorCode::TermPolicyAlreadyAccepted
            | ErrorCode::TermPolicyAlreadyPublished => StatusCode::CONFLICT,
            ErrorCode::Unauthorized
            | ErrorCode::InvalidCredentials
            | ErrorCode::SessionInvalid
            | ErrorCode::SessionExpired
            | ErrorCode::WebhookUnauthorized
            | ErrorCode::ApiKeyInvalid
            | ErrorCode::ApiKeyInactive
            | ErrorCode::ApiKeyExpired => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden | ErrorCode::UserInactive | ErrorCode::RoleProtected => {
                StatusCode::FORBIDDEN
            }
            ErrorCode::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::FilePresignUnsupported => StatusCode::NOT_IMPLEMENTED,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "validation failed",
            ErrorCode::NotFound => "resource not found",
            ErrorCode::Conflict => "resource already exists",
            ErrorCode::Internal => "internal server error",
            ErrorCode::Unauthorized => "authentication required",
            ErrorCode::InvalidCredentials => "invalid email or password",
            ErrorCode::SessionInvalid => "session is no longer valid",
            ErrorCode::SessionExpired => "session expired",
            ErrorCode::EmailTaken => "email is already registered",
            ErrorCode::Forbidden => "not allowed to perform this action",
            ErrorCode::UserInactive => "user account is disabled",
            ErrorCode::UserNotFound => "user not found",
            ErrorCode::RoleNotFound => "role not found",
            ErrorCode::RoleNameTaken => "role name already in use",
            ErrorCode::RoleProtected => "system roles cannot be removed",
            ErrorCode::PermissionNotFound => "permission not found",
            ErrorCode::PermissionExists => "permission already exists",
            ErrorCode::SettingNotFound => "setting not found",
            ErrorCode::FileNotFound => "file not found",
            ErrorCode::FileTooLarge => "file exceeds the upload limit",
            ErrorCode::FileInvalid => "invalid file upload",
            ErrorCode::FilePresignUnsupported => {
                "presigned urls are not supported by the storage backend"
            }
            ErrorCode::NotificationNotFound => "notification not found",
            ErrorCode::WebhookUnauthorized => "invalid webhook secret",
            ErrorCode::ApiKeyInvalid => "invalid api key",
            ErrorCode::ApiKeyInactive => "api key is inactive",
            ErrorCode::ApiKeyExpired => "api key has expired",
            ErrorCode::ApiKeyNotFound => "api key not found",
            ErrorCode::TermPolicyNotFound => "term policy not found",
            ErrorCode::TermPolicyAlreadyAccepted => "term policy already accepted",
            ErrorCode::TermPolicyAlreadyPublished => "term policy already published",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Domain {
        code: ErrorCode,
        message: Cow<'static, str>,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn code(code: ErrorCode) -> Self {
        AppError::Domain {
            code,
            message: Cow::Borrowed(code.default_message()),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        AppError::Domain {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, message)
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Domain { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<ErrorCode> for AppError {
    fn from(code: ErrorCode) -> Self {
        AppError::code(code)
    }
}

impl From<ApiKeyRejection> for AppError {
    fn from(r: ApiKeyRejection) -> Self {
        match r {
            ApiKeyRejection::Revoked => AppError::code(ErrorCode::ApiKeyInvalid),
            ApiKeyRejection::Inactive => AppError::code(ErrorCode::ApiKeyInactive),
            ApiKeyRejection::Expired => AppError::code(ErrorCode::ApiKeyExpired),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();
        AppError::validation(fields.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn api_key_codes_live_in_5100_block() {
        for code in [
            ErrorCode::ApiKeyInvalid,
            ErrorCode::ApiKeyInactive,
            ErrorCode::ApiKeyExpired,
            ErrorCode::ApiKeyNotFound,
        ] {
            assert_eq!(code.as_u16() / 100, 51, "{}", code.name());
        }
    }

    #[test]
    fn term_policy_codes_live_in_6100_block() {
        for code in [
            ErrorCode::TermPolicyNotFound,
            ErrorCode::TermPolicyAlreadyAccepted,
            ErrorCode::TermPolicyAlreadyPublished,
        ] {
            assert_eq!(code.as_u16() / 100, 61, "{}", code.name());
        }
    }

    #[test]
    fn statuses() {
        assert_eq!(ErrorCode::ApiKeyExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::TermPolicyAlreadyAccepted.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::FileTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn api_key_rejections_map_to_codes() {
        assert_eq!(
            AppError::from(ApiKeyRejection::Expired).error_code(),
            ErrorCode::ApiKeyExpired
        );
        assert_eq!(
            AppError::from(ApiKeyRejection::Revoked).error_code(),
            ErrorCode::ApiKeyInvalid
        );
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(email)]
        email: String,
        #[validate(length(min = 8, message = "too short"))]
        password: String,
    }

    #[test]
    fn validation_errors_list_fields_in_order() {
        let err: AppError = Probe {
            email: "nope".into(),
            password: "x".into(),
        }
        .validate()
        .unwrap_err()
        .into();
        assert_eq!(err.error_code(), ErrorCode::ValidationFailed);
        assert_eq!(err.to_string(), "email: email; password: too short");
    }
}
