use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::files::errors::FileError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Maps a service error onto a status; server faults get the
    /// operation's generic `failure` text and keep the detail in the logs.
    pub fn from_file_error(err: FileError, failure: &'static str) -> Self {
        match err {
            FileError::InvalidName => Self::bad_request("Invalid file name"),
            FileError::AlreadyExists => Self::new(StatusCode::CONFLICT, "File already exists"),
            FileError::NotFound => Self::new(StatusCode::NOT_FOUND, "File not found"),
            other => {
                tracing::warn!(error = ?other, "file_request_failed");
                Self::internal(failure)
            }
        }
    }

    /// Multipart failures include hitting the body limit, which keeps its 413.
    pub fn from_multipart(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(status, "File too large")
        } else {
            Self::bad_request("Failed to parse multipart form")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_map_to_client_statuses() {
        let cases = [
            (FileError::InvalidName, StatusCode::BAD_REQUEST),
            (FileError::AlreadyExists, StatusCode::CONFLICT),
            (FileError::NotFound, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_file_error(err, "x").status, status);
        }
    }

    #[test]
    fn backend_errors_hide_detail() {
        let err = FileError::backend("put", "test/a.txt", anyhow::anyhow!("secret bucket detail"));
        let api = ApiError::from_file_error(err, "Failed to create file");
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Failed to create file");
    }
}
