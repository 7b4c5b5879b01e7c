use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline::{ErrorKind, PipelineError, UploadError};
use thiserror::Error;
use web_cmn::responses::ErrorResponse;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<UploadError> for BackendError {
    fn from(err: UploadError) -> Self {
        BackendError::Pipeline(err.into())
    }
}

impl BackendError {
    fn kind(&self) -> ErrorKind {
        match self {
            BackendError::BadRequest(_) | BackendError::Multipart(_) => ErrorKind::Upload,
            BackendError::Pipeline(err) => err.kind(),
        }
    }

    fn status(&self) -> StatusCode {
        if let BackendError::Multipart(err) = self {
            return err.status();
        }
        match self.kind() {
            ErrorKind::Upload => StatusCode::BAD_REQUEST,
            ErrorKind::Tool => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Degenerate => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Workspace | ErrorKind::Model | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            tracing::error!(%kind, "Request failed: {self}");
        } else {
            tracing::warn!(%kind, "Request rejected: {self}");
        }

        (status, Json(ErrorResponse::failed(kind.as_str(), self.to_string()))).into_response()
    }
}
