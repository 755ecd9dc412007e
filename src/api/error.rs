//! API error handling for consistent JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::analysis::AnalysisError;
use crate::app::AppError;
use crate::recording::RecordingError;
use crate::review::ReviewError;

/// API error type that converts to JSON responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let message = err.to_string();
        match err {
            AppError::NoSession
            | AppError::MeetingNotFound(_)
            | AppError::Review(ReviewError::ItemNotFound(_)) => Self::not_found(message),
            AppError::NoReview
            | AppError::Review(ReviewError::NothingSelected)
            | AppError::Recording(RecordingError::InvalidTransition { .. })
            | AppError::Recording(RecordingError::RecognitionUnavailable)
            | AppError::Analysis(AnalysisError::EmptyTranscript)
            | AppError::Analysis(AnalysisError::InFlight) => Self::bad_request(message),
            _ => Self::internal(message),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
