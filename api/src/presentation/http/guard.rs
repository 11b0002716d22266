use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, HeaderValue, header, request::Parts};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::access::Principal;
use crate::application::errors::{AppError, ErrorCode};
use crate::application::use_cases::auth::ClientInfo;
use crate::application::use_cases::auth::authenticate::{AuthenticateApiKey, AuthenticateSession};
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ACCESS_COOKIE: &str = "access_token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub sid: String,
    pub iat: usize,
    pub exp: usize,
}

pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

pub fn issue_access_token(
    cfg: &Config,
    user_id: Uuid,
    session_id: Uuid,
) -> anyhow::Result<IssuedToken> {
    let now = chrono::Utc::now().timestamp();
    let expires_in = cfg.access_ttl().num_seconds();
    let claims = Claims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        iat: now as usize,
        exp: (now + expires_in) as usize,
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )?;
    Ok(IssuedToken { token, expires_in })
}

/// Verifies signature and expiry and returns `(user_id, session_id)`.
pub fn decode_access_token(cfg: &Config, token: &str) -> Option<(Uuid, Uuid)> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    let user_id = Uuid::parse_str(&data.claims.sub).ok()?;
    let session_id = Uuid::parse_str(&data.claims.sid).ok()?;
    Some((user_id, session_id))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    // Authorization header wins over the cookie
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(t) = auth.strip_prefix("Bearer ") {
            return Some(t.trim().to_string());
        }
    }
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|c| get_cookie(c, ACCESS_COOKIE))
        .filter(|t| !t.is_empty())
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn get_cookie(cookie_header: &str, name: &str) -> Option<String> {
    for part in cookie_header.split(';') {
        if let Some((k, v)) = part.trim().split_once('=') {
            if k.trim() == name {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

fn secure_cookies(cfg: &Config) -> bool {
    cfg.frontend_url
        .as_deref()
        .map(|u| u.starts_with("https://"))
        .unwrap_or(false)
}

pub fn access_cookie(cfg: &Config, token: &str) -> HeaderValue {
    let secure_attr = if secure_cookies(cfg) { "; Secure" } else { "" };
    let cookie = format!(
        "{}={}; HttpOnly{}; Path=/; Max-Age={}; SameSite=Lax",
        ACCESS_COOKIE,
        token,
        secure_attr,
        cfg.access_ttl().num_seconds()
    );
    HeaderValue::from_str(&cookie).unwrap_or(HeaderValue::from_static(""))
}

pub fn cleared_access_cookie(cfg: &Config) -> HeaderValue {
    if secure_cookies(cfg) {
        HeaderValue::from_static("access_token=; HttpOnly; Secure; Path=/; Max-Age=0; SameSite=Lax")
    } else {
        HeaderValue::from_static("access_token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax")
    }
}

/// Resolves the caller. An `x-api-key` header is tried first; otherwise a
/// bearer token (header or cookie) must reference a live session.
async fn resolve(parts: &Parts, ctx: &AppContext) -> Result<Principal, AppError> {
    let users = ctx.user_repo();
    let roles = ctx.role_repo();
    if let Some(key) = api_key(&parts.headers) {
        let api_keys = ctx.api_key_repo();
        return AuthenticateApiKey {
            api_keys: api_keys.as_ref(),
            users: users.as_ref(),
            roles: roles.as_ref(),
        }
        .execute(key)
        .await;
    }
    let token = bearer_token(&parts.headers).ok_or_else(|| AppError::code(ErrorCode::Unauthorized))?;
    let (user_id, session_id) = decode_access_token(&ctx.cfg, &token)
        .ok_or_else(|| AppError::code(ErrorCode::Unauthorized))?;
    let sessions = ctx.session_repo();
    AuthenticateSession {
        sessions: sessions.as_ref(),
        users: users.as_ref(),
        roles: roles.as_ref(),
    }
    .execute(user_id, session_id)
    .await
}

fn has_credentials(headers: &HeaderMap) -> bool {
    api_key(headers).is_some() || bearer_token(headers).is_some()
}

/// A caller authenticated by api key or session.
pub struct Authenticated(pub Principal);

#[axum::async_trait]
impl FromRequestParts<AppContext> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        resolve(parts, ctx).await.map(Authenticated)
    }
}

/// Anonymous callers and callers with stale credentials both resolve to `None`.
pub struct MaybeAuthenticated(pub Option<Principal>);

#[axum::async_trait]
impl FromRequestParts<AppContext> for MaybeAuthenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        if !has_credentials(&parts.headers) {
            return Ok(MaybeAuthenticated(None));
        }
        match resolve(parts, ctx).await {
            Ok(p) => Ok(MaybeAuthenticated(Some(p))),
            Err(AppError::Internal(err)) => Err(AppError::Internal(err)),
            Err(err) => {
                tracing::debug!(code = err.error_code().as_u16(), "optional_auth_ignored");
                Ok(MaybeAuthenticated(None))
            }
        }
    }
}

/// User agent and client address of the request.
pub struct Client(pub ClientInfo);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Client(client_info(parts)))
    }
}

fn client_info(parts: &Parts) -> ClientInfo {
    let header_str = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let forwarded = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let ip = forwarded
        .or_else(|| header_str("x-real-ip").map(str::to_string))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
    ClientInfo {
        user_agent: header_str(header::USER_AGENT.as_str()).map(|ua| ua.chars().take(512).collect()),
        ip,
    }
}
