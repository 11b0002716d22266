use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::services::audit;
use crate::application::use_cases::term_policies::accept::AcceptPolicy;
use crate::application::use_cases::term_policies::list_policies::ListPolicies;
use crate::application::use_cases::term_policies::manage_policy::{
    CreatePolicyRequest, ManagePolicy, UpdatePolicyRequest,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::terms::term_policy::TermPolicy;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client, MaybeAuthenticated};

#[derive(Debug, Serialize, ToSchema)]
pub struct TermPolicyResponse {
    pub id: Uuid,
    pub kind: String,
    pub version: String,
    pub title: String,
    pub content: String,
    /// Null while the policy is a draft
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TermPolicy> for TermPolicyResponse {
    fn from(p: TermPolicy) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            version: p.version,
            title: p.title,
            content: p.content,
            published_at: p.published_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

fn to_responses(policies: Vec<TermPolicy>) -> Vec<TermPolicyResponse> {
    policies.into_iter().map(Into::into).collect()
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/term-policies", get(list_policies).post(create_policy))
        .route("/term-policies/current", get(current_policies))
        .route("/term-policies/pending", get(pending_policies))
        .route(
            "/term-policies/:id",
            get(get_policy).patch(update_policy).delete(delete_policy),
        )
        .route("/term-policies/:id/publish", post(publish_policy))
        .route("/term-policies/:id/accept", post(accept_policy))
        .with_state(ctx)
}

/// Drafts are included for callers allowed to edit policies.
#[utoipa::path(get, path = "/api/term-policies", tag = "TermPolicies",
    responses((status = 200, body = [TermPolicyResponse])))]
pub async fn list_policies(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<TermPolicyResponse>>> {
    principal.require(Action::Read, Subject::TermPolicy)?;
    let repo = ctx.term_policy_repo();
    let mut policies = ListPolicies {
        repo: repo.as_ref(),
    }
    .all()
    .await?;
    if !principal.can(Action::Update, Subject::TermPolicy) {
        policies.retain(TermPolicy::is_published);
    }
    Ok(Json(to_responses(policies)))
}

#[utoipa::path(get, path = "/api/term-policies/current", tag = "TermPolicies",
    responses((status = 200, description = "Latest published policy per kind", body = [TermPolicyResponse])))]
pub async fn current_policies(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<TermPolicyResponse>>> {
    let repo = ctx.term_policy_repo();
    let policies = ListPolicies {
        repo: repo.as_ref(),
    }
    .current()
    .await?;
    Ok(Json(to_responses(policies)))
}

#[utoipa::path(get, path = "/api/term-policies/pending", tag = "TermPolicies",
    responses((status = 200, description = "Current policies the caller has not accepted", body = [TermPolicyResponse])))]
pub async fn pending_policies(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<Vec<TermPolicyResponse>>> {
    let repo = ctx.term_policy_repo();
    let policies = ListPolicies {
        repo: repo.as_ref(),
    }
    .pending(principal.user_id)
    .await?;
    Ok(Json(to_responses(policies)))
}

#[utoipa::path(get, path = "/api/term-policies/{id}", tag = "TermPolicies",
    params(("id" = Uuid, Path, description = "Policy ID")),
    responses((status = 200, body = TermPolicyResponse), (status = 404, body = ErrorBody)))]
pub async fn get_policy(
    State(ctx): State<AppContext>,
    MaybeAuthenticated(principal): MaybeAuthenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TermPolicyResponse>> {
    let include_drafts = principal
        .as_ref()
        .is_some_and(|p| p.can(Action::Update, Subject::TermPolicy));
    let repo = ctx.term_policy_repo();
    let policy = ListPolicies {
        repo: repo.as_ref(),
    }
    .get(id, include_drafts)
    .await?;
    Ok(Json(policy.into()))
}

#[utoipa::path(post, path = "/api/term-policies", tag = "TermPolicies", request_body = CreatePolicyRequest,
    responses((status = 201, body = TermPolicyResponse), (status = 409, body = ErrorBody)))]
pub async fn create_policy(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Json(req): Json<CreatePolicyRequest>,
) -> ApiResult<(StatusCode, Json<TermPolicyResponse>)> {
    principal.require(Action::Create, Subject::TermPolicy)?;
    let repo = ctx.term_policy_repo();
    let policy = ManagePolicy {
        repo: repo.as_ref(),
    }
    .create(&req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "create", "TermPolicy")
            .with_subject_id(policy.id)
            .with_metadata(json!({ "kind": policy.kind, "version": policy.version }))
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(policy.into())))
}

#[utoipa::path(patch, path = "/api/term-policies/{id}", tag = "TermPolicies", request_body = UpdatePolicyRequest,
    params(("id" = Uuid, Path, description = "Policy ID")),
    responses((status = 200, body = TermPolicyResponse), (status = 409, description = "Already published", body = ErrorBody)))]
pub async fn update_policy(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePolicyRequest>,
) -> ApiResult<Json<TermPolicyResponse>> {
    principal.require(Action::Update, Subject::TermPolicy)?;
    let repo = ctx.term_policy_repo();
    let policy = ManagePolicy {
        repo: repo.as_ref(),
    }
    .update(id, &req)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "update", "TermPolicy")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(policy.into()))
}

#[utoipa::path(post, path = "/api/term-policies/{id}/publish", tag = "TermPolicies",
    params(("id" = Uuid, Path, description = "Policy ID")),
    responses((status = 200, body = TermPolicyResponse), (status = 409, description = "Already published", body = ErrorBody)))]
pub async fn publish_policy(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TermPolicyResponse>> {
    principal.require(Action::Update, Subject::TermPolicy)?;
    let repo = ctx.term_policy_repo();
    let policy = ManagePolicy {
        repo: repo.as_ref(),
    }
    .publish(id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "publish", "TermPolicy")
            .with_subject_id(id)
            .with_metadata(json!({ "kind": policy.kind, "version": policy.version }))
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(policy.into()))
}

#[utoipa::path(delete, path = "/api/term-policies/{id}", tag = "TermPolicies",
    params(("id" = Uuid, Path, description = "Policy ID")),
    responses((status = 204), (status = 409, description = "Published policies cannot be deleted", body = ErrorBody)))]
pub async fn delete_policy(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(Action::Delete, Subject::TermPolicy)?;
    let repo = ctx.term_policy_repo();
    ManagePolicy {
        repo: repo.as_ref(),
    }
    .delete(id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "delete", "TermPolicy")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/term-policies/{id}/accept", tag = "TermPolicies",
    params(("id" = Uuid, Path, description = "Policy ID")),
    responses(
        (status = 200, body = TermPolicyResponse),
        (status = 404, body = ErrorBody),
        (status = 409, description = "Already accepted", body = ErrorBody)
    ))]
pub async fn accept_policy(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TermPolicyResponse>> {
    let repo = ctx.term_policy_repo();
    let policy = AcceptPolicy {
        repo: repo.as_ref(),
    }
    .execute(principal.user_id, id, client.ip.as_deref())
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "accept", "TermPolicy")
            .with_subject_id(id)
            .with_metadata(json!({ "kind": policy.kind, "version": policy.version }))
            .with_ip(client.ip),
    )
    .await;
    Ok(Json(policy.into()))
}
