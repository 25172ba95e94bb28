use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use caption_base::CaptionError;
use caption_history::StoreError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Caption(#[from] CaptionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("invalid json body: {}", .0.body_text())]
    Json(#[from] JsonRejection),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Caption(e) if e.is_user_error() => StatusCode::BAD_REQUEST,
            Self::Caption(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(StoreError::InvalidId(_) | StoreError::EmptyText) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Multipart(e) => e.status(),
            Self::Json(e) => e.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        let model = match &self {
            Self::Caption(e) => e.model(),
            _ => None,
        };
        let body = ErrorBody {
            status: "error",
            message: self.to_string(),
            model,
        };

        (status, Json(body)).into_response()
    }
}
