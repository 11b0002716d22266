use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::errors::AppError;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status_code: u16,
    pub code: u16,
    pub error: String,
    pub message: String,
}

pub type ApiResult<T> = Result<T, AppError>;

impl ErrorBody {
    pub fn from_error(err: &AppError) -> Self {
        let code = err.error_code();
        let message = match err {
            AppError::Domain { message, .. } => message.to_string(),
            // never leak internals to the client
            AppError::Internal(_) => "internal server error".to_string(),
        };
        Self {
            status_code: code.status().as_u16(),
            code: code.as_u16(),
            error: code.name().to_string(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(err) = &self {
            tracing::error!(error = ?err, "request_failed");
        }
        let body = ErrorBody::from_error(&self);
        (self.error_code().status(), Json(body)).into_response()
    }
}
