use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::errors::{AppError, ErrorCode};
use crate::application::pagination::{PageQuery, PageRequest};
use crate::application::services::audit;
use crate::application::use_cases::files::delete_file::DeleteFile;
use crate::application::use_cases::files::get_file::{GetFile, ListFiles, ReadFileContent};
use crate::application::use_cases::files::presign::{
    PresignDownload, PresignUpload, PresignUploadRequest,
};
use crate::application::use_cases::files::upload_file::UploadFile;
use crate::bootstrap::app_context::AppContext;
use crate::domain::activity::activity_log::NewActivity;
use crate::domain::files::stored_file::StoredFile;
use crate::presentation::http::error::ApiResult;
use crate::presentation::http::guard::{Authenticated, Client};
use crate::presentation::http::pagination::PageResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,
    /// sha256 of the content, hex encoded
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoredFile> for FileResponse {
    fn from(f: StoredFile) -> Self {
        Self {
            id: f.id,
            owner_id: f.owner_id,
            filename: f.filename,
            content_type: f.content_type,
            size: f.size,
            content_hash: f.content_hash,
            created_at: f.created_at,
        }
    }
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadFileMultipart {
    /// File to upload
    #[schema(value_type = String, format = Binary)]
    file: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresignedUploadResponse {
    pub url: String,
    pub key: String,
    pub method: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresignedDownloadResponse {
    pub url: String,
    pub expires_in: u64,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/presign", post(presign_upload))
        .route("/files/:id", get(get_file).delete(delete_file))
        .route("/files/:id/content", get(file_content))
        .route("/files/:id/presign", get(presign_download))
        .with_state(ctx)
}

/// POST /api/files (multipart/form-data, field `file`)
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "Files",
    request_body(content = UploadFileMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 413, body = ErrorBody)
    )
)]
pub async fn upload_file(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<FileResponse>)> {
    let bad_multipart = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::code(ErrorCode::FileTooLarge)
        } else {
            AppError::with_message(ErrorCode::FileInvalid, e.body_text())
        }
    };
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut orig_filename: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        orig_filename = field.file_name().map(|s| s.to_string());
        content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(bad_multipart)?;
        file_bytes = Some(data.to_vec());
    }
    let bytes = file_bytes
        .ok_or_else(|| AppError::with_message(ErrorCode::FileInvalid, "missing `file` field"))?;

    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    let file = UploadFile {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
        max_bytes: ctx.cfg.upload_max_bytes,
    }
    .execute(principal.user_id, bytes, orig_filename, content_type)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "upload", "File")
            .with_subject_id(file.id)
            .with_metadata(json!({ "filename": file.filename, "size": file.size }))
            .with_ip(client.ip),
    )
    .await;
    Ok((StatusCode::CREATED, Json(file.into())))
}

#[utoipa::path(get, path = "/api/files", tag = "Files", params(PageQuery),
    responses((status = 200, body = FilePage)))]
pub async fn list_files(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<FileResponse>>> {
    let repo = ctx.files_repo();
    let page = ListFiles {
        repo: repo.as_ref(),
    }
    .execute(principal.user_id, PageRequest::from(q))
    .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(get, path = "/api/files/{id}", tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses((status = 200, body = FileResponse), (status = 404, body = ErrorBody)))]
pub async fn get_file(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FileResponse>> {
    let repo = ctx.files_repo();
    let file = GetFile {
        repo: repo.as_ref(),
    }
    .execute(&principal, id)
    .await?;
    Ok(Json(file.into()))
}

#[utoipa::path(get, path = "/api/files/{id}/content", tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "OK", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, body = ErrorBody)
    ))]
pub async fn file_content(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    let (file, data) = ReadFileContent {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
    }
    .execute(&principal, id)
    .await?;

    let mut headers = HeaderMap::new();
    let ct = file
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, ct);
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        file.filename.replace('"', ""),
        urlencoding::encode(&file.filename)
    );
    if let Ok(v) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    headers.insert(
        header::HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    Ok((headers, data).into_response())
}

#[utoipa::path(delete, path = "/api/files/{id}", tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses((status = 204), (status = 404, body = ErrorBody)))]
pub async fn delete_file(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Client(client): Client,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    DeleteFile {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
    }
    .execute(&principal, id)
    .await?;
    audit::record(
        ctx.activity_repo().as_ref(),
        NewActivity::new(Some(principal.user_id), "delete", "File")
            .with_subject_id(id)
            .with_ip(client.ip),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/files/presign", tag = "Files", request_body = PresignUploadRequest,
    responses(
        (status = 200, body = PresignedUploadResponse),
        (status = 501, description = "Storage backend cannot presign", body = ErrorBody)
    ))]
pub async fn presign_upload(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Json(req): Json<PresignUploadRequest>,
) -> ApiResult<Json<PresignedUploadResponse>> {
    let storage = ctx.storage_port();
    let ttl = ctx.cfg.presign_ttl();
    let presigned = PresignUpload {
        storage: storage.as_ref(),
        ttl,
    }
    .execute(principal.user_id, &req)
    .await?;
    Ok(Json(PresignedUploadResponse {
        url: presigned.url,
        key: presigned.key,
        method: presigned.method,
        expires_in: ttl.as_secs(),
    }))
}

#[utoipa::path(get, path = "/api/files/{id}/presign", tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, body = PresignedDownloadResponse),
        (status = 501, description = "Storage backend cannot presign", body = ErrorBody)
    ))]
pub async fn presign_download(
    State(ctx): State<AppContext>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PresignedDownloadResponse>> {
    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    let ttl = ctx.cfg.presign_ttl();
    let url = PresignDownload {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
        ttl,
    }
    .execute(&principal, id)
    .await?;
    Ok(Json(PresignedDownloadResponse {
        url,
        expires_in: ttl.as_secs(),
    }))
}
