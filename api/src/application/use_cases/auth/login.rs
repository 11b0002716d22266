use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::session_repository::{NewSession, SessionRepository};
use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::passwords::verify_password;
use crate::application::services::secrets::{compose_refresh_token, random_token, sha256_hex};
use crate::application::use_cases::auth::{ClientInfo, normalize_email};
use crate::application::use_cases::term_policies::pending_for_user;
use crate::domain::auth::session::Session;
use crate::domain::terms::term_policy::TermPolicy;
use crate::domain::users::user::User;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub session: Session,
    pub refresh_token: String,
    pub pending_policies: Vec<TermPolicy>,
}

pub struct Login<'a, U, S, T>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
    T: TermPolicyRepository + ?Sized,
{
    pub users: &'a U,
    pub sessions: &'a S,
    pub policies: &'a T,
    pub refresh_ttl: chrono::Duration,
}

impl<'a, U, S, T> Login<'a, U, S, T>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
    T: TermPolicyRepository + ?Sized,
{
    pub async fn execute(&self, req: &LoginRequest, client: &ClientInfo) -> AppResult<LoginOutcome> {
        // trim before validating so padded input is accepted
        let req = LoginRequest {
            email: normalize_email(&req.email),
            ..req.clone()
        };
        req.validate()?;
        let email = req.email.clone();
        let Some(creds) = self.users.find_credentials_by_email(&email).await? else {
            tracing::info!(reason = "unknown_email", "login_failed");
            return Err(AppError::code(ErrorCode::InvalidCredentials));
        };
        if !verify_password(&creds.password_hash, &req.password) {
            tracing::info!(user_id = %creds.id, reason = "bad_password", "login_failed");
            return Err(AppError::code(ErrorCode::InvalidCredentials));
        }
        if !creds.is_active {
            tracing::info!(user_id = %creds.id, reason = "inactive", "login_failed");
            return Err(AppError::code(ErrorCode::UserInactive));
        }
        let user = self
            .users
            .find_by_id(creds.id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::InvalidCredentials))?;

        let session_id = Uuid::new_v4();
        let secret = random_token(32);
        let session = self
            .sessions
            .create(NewSession {
                id: session_id,
                user_id: user.id,
                refresh_token_hash: sha256_hex(&secret),
                user_agent: client.user_agent.clone(),
                ip: client.ip.clone(),
                expires_at: Utc::now() + self.refresh_ttl,
            })
            .await?;
        let pending_policies = pending_for_user(self.policies, user.id).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "login_succeeded");
        Ok(LoginOutcome {
            refresh_token: compose_refresh_token(session.id, &secret),
            user,
            session,
            pending_policies,
        })
    }
}
